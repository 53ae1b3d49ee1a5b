//! The tick orchestrator.
//!
//! [`advance`] is the whole state-transition function: it takes the
//! previous [`GameState`], runs every phase in a fixed order on it and
//! hands back the next state together with the notifications raised.
//! Phases are gated by `tick % period == 0` so that expensive behaviors
//! spread across ticks.
//!
//! # Determinism
//!
//! - All randomness comes from the single [`SimRng`] passed in
//! - Factions are visited in id order, tiles row-major, units by id
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - Same state, catalog and RNG state always produce the same next state
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use realm_core::prelude::*;
//!
//! # fn main() -> realm_core::error::Result<()> {
//! let catalog = Arc::new(Catalog::from_ron_str(r#"(
//!     biomes: [BiomeData(id: "plains", name: "Plains")],
//! )"#)?);
//! let state = WorldBuilder::new(&catalog, 8, 8, "plains")?.build();
//!
//! let mut sim = Simulation::new(catalog, state, 42);
//! let events = sim.tick();
//! assert_eq!(events.tick, 1);
//! assert_eq!(sim.state().tick(), 1);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ai::{diplomacy, expansion, leader, management};
use crate::data::Catalog;
use crate::economy;
use crate::error::{GameError, Result};
use crate::events::{EventCategory, Notification, NotificationSink};
use crate::factions::FactionId;
use crate::movement;
use crate::population;
use crate::rng::SimRng;
use crate::spawner;
use crate::state::{GameState, ATTACK_FLASH_TTL, DYING_TTL, TICK_PER_YEAR};

/// Population growth, research and tech unlocks.
pub const POPULATION_PERIOD: u64 = 50;
/// Storage capacity recalculation.
pub const STORAGE_PERIOD: u64 = 251;
/// Upgrades and training.
pub const MANAGEMENT_PERIOD: u64 = 101;
/// Leader adventures.
pub const LEADER_PERIOD: u64 = 201;
/// Opinion, war and alliances.
pub const DIPLOMACY_PERIOD: u64 = 151;
/// New structures.
pub const EXPANSION_PERIOD: u64 = 50;
/// Timers, regeneration, movement and combat.
pub const UNIT_PERIOD: u64 = 50;
/// Deposit respawn.
pub const RESPAWN_PERIOD: u64 = 101;
/// Hostile spawn attempts.
pub const HOSTILE_SPAWN_PERIOD: u64 = 400;
/// World event placement.
pub const WORLD_EVENT_PERIOD: u64 = 2 * TICK_PER_YEAR;

/// Per-tick services handed to every phase.
#[derive(Debug)]
pub struct TickContext<'a> {
    /// Static definitions.
    pub catalog: &'a Catalog,
    /// The one random source.
    pub rng: &'a mut SimRng,
    /// Notifications raised so far this tick.
    pub notifications: Vec<Notification>,
}

impl<'a> TickContext<'a> {
    /// Context with no notifications yet.
    pub fn new(catalog: &'a Catalog, rng: &'a mut SimRng) -> Self {
        Self {
            catalog,
            rng,
            notifications: Vec::new(),
        }
    }

    /// Queue a notification for delivery after the tick.
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

/// What one tick produced besides the new state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// The tick just completed.
    pub tick: u64,
    /// Notifications in the order they were raised.
    pub notifications: Vec<Notification>,
}

const fn due(tick: u64, period: u64) -> bool {
    tick % period == 0
}

/// Advance `state` by one tick.
#[must_use]
pub fn advance(mut state: GameState, catalog: &Catalog, rng: &mut SimRng) -> (GameState, TickEvents) {
    let events = step(&mut state, catalog, rng);
    (state, events)
}

/// Advance `state` in place by one tick.
///
/// Observers never see the state between phases; the caller owns it
/// exclusively for the duration of the call.
pub fn step(state: &mut GameState, catalog: &Catalog, rng: &mut SimRng) -> TickEvents {
    let mut ctx = TickContext::new(catalog, rng);

    // 1. time and cleanup
    state.tick += 1;
    let tick = state.tick;
    if due(tick, TICK_PER_YEAR) {
        let before = state.epoch();
        state.year += 1;
        let after = state.epoch();
        if before != after {
            state.log(EventCategory::World, format!("The {} begins", after.name()), None);
        }
    }
    // flashes live through their fifth tick, dying units leave on their 25th
    state
        .attack_flashes
        .retain(|flash| tick - flash.tick <= ATTACK_FLASH_TTL);
    state
        .dying
        .retain(|dead| tick - dead.death_tick < DYING_TTL);
    spawner::expire_world_events(state);

    let factions: Vec<FactionId> = state.factions.keys().cloned().collect();

    // 2. population and research
    if due(tick, POPULATION_PERIOD) {
        for id in &factions {
            population::grow(state, catalog, id);
            population::accrue_research(state, catalog, id);
            population::unlock_tech(state, &mut ctx, id);
        }
    }

    // 3. Athar
    population::accrue_athar(state);

    // 4. production
    economy::production_sweep(state, &mut ctx);

    // 5. faction behaviors
    for id in &factions {
        if due(tick, STORAGE_PERIOD) {
            economy::recalculate_storage(state, catalog, id);
        }
        if due(tick, MANAGEMENT_PERIOD) {
            management::run(state, &mut ctx, id);
        }
        if due(tick, LEADER_PERIOD) {
            leader::run(state, &mut ctx, id);
        }
        if due(tick, DIPLOMACY_PERIOD) {
            diplomacy::run(state, &mut ctx, id);
        }
        if due(tick, EXPANSION_PERIOD) && tick > 1 {
            expansion::run(state, &mut ctx, id);
        }
    }

    // 6. units
    if due(tick, UNIT_PERIOD) {
        movement::unit_sweep(state, &mut ctx);
    }

    // 7. world
    if due(tick, RESPAWN_PERIOD) {
        economy::respawn_sweep(state, &mut ctx);
    }
    if due(tick, HOSTILE_SPAWN_PERIOD) {
        spawner::spawn_hostile(state, &mut ctx);
    }
    if due(tick, WORLD_EVENT_PERIOD) {
        spawner::place_world_event(state, &mut ctx);
    }

    #[cfg(feature = "debug-validation")]
    for problem in state.check_invariants(catalog) {
        tracing::error!(tick, problem = %problem, "Invariant violated");
    }

    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!(tick, state_hash = state.state_hash(), "Tick committed");
    }

    TickEvents {
        tick,
        notifications: ctx.notifications,
    }
}

/// A running world: catalog, state and random stream together.
///
/// # Phase Order
///
/// Each tick runs, in order:
/// 1. **Cleanup** - tick and year counters, expiring markers
/// 2. **Population** - growth, research, tech unlocks (every 50)
/// 3. **Athar** - soft-currency accrual (every tick)
/// 4. **Production** - extractors and processors (every tick)
/// 5. **Factions** - storage 251, management 101, leader 201,
///    diplomacy 151, expansion 50
/// 6. **Units** - timers, regeneration, movement, combat (every 50)
/// 7. **World** - deposit respawn 101, hostiles 400, world events 2000
#[derive(Debug, Clone)]
pub struct Simulation {
    catalog: Arc<Catalog>,
    state: GameState,
    rng: SimRng,
    seed: u64,
}

#[derive(Serialize)]
struct SavedRef<'a> {
    seed: u64,
    rng: &'a SimRng,
    state: &'a GameState,
}

#[derive(Deserialize)]
struct Saved {
    seed: u64,
    rng: SimRng,
    state: GameState,
}

impl Simulation {
    /// Start a simulation from `state` with a fresh stream for `seed`.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, state: GameState, seed: u64) -> Self {
        Self {
            catalog,
            state,
            rng: SimRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Rebuild a simulation mid-stream.
    #[must_use]
    pub fn from_parts(catalog: Arc<Catalog>, state: GameState, rng: SimRng, seed: u64) -> Self {
        Self {
            catalog,
            state,
            rng,
            seed,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Shared catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Random stream position.
    #[must_use]
    pub const fn rng(&self) -> &SimRng {
        &self.rng
    }

    /// Seed the stream started from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Current tick.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.state.tick()
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> TickEvents {
        step(&mut self.state, &self.catalog, &mut self.rng)
    }

    /// Advance one tick, then hand each notification to `sink`.
    pub fn tick_with_sink(&mut self, sink: &mut dyn NotificationSink) -> TickEvents {
        let events = self.tick();
        for notification in &events.notifications {
            sink.notify(notification);
        }
        events
    }

    /// Advance `ticks` ticks, discarding notifications.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Digest of the current state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.state.state_hash()
    }

    /// Encode seed, RNG and state with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let saved = SavedRef {
            seed: self.seed,
            rng: &self.rng,
            state: &self.state,
        };
        bincode::serialize(&saved)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Decode bytes produced by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed.
    pub fn deserialize(catalog: Arc<Catalog>, data: &[u8]) -> Result<Self> {
        let saved: Saved = bincode::deserialize(data).map_err(|e| {
            GameError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })?;
        Ok(Self::from_parts(catalog, saved.state, saved.rng, saved.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::grid::TilePos;
    use crate::state::{AttackFlash, Epoch};
    use crate::test_fixtures::{catalog, two_faction_world};

    fn sim(seed: u64) -> Simulation {
        let catalog = Arc::new(catalog());
        let state = two_faction_world(&catalog);
        Simulation::new(catalog, state, seed)
    }

    #[test]
    fn test_tick_and_year_advance() {
        let mut sim = sim(1);
        sim.run(TICK_PER_YEAR);
        assert_eq!(sim.state().tick(), TICK_PER_YEAR);
        assert_eq!(sim.state().year(), 1);
        assert_eq!(sim.state().epoch(), Epoch::Founding);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let mut a = sim(7);
        let mut b = sim(7);
        a.run(600);
        b.run(600);
        assert_eq!(a.state_hash(), b.state_hash());
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_sink_does_not_change_outcome() {
        let mut a = sim(3);
        let mut b = sim(3);
        let mut recorded: Vec<Notification> = Vec::new();
        for _ in 0..500 {
            let events = a.tick_with_sink(&mut recorded);
            assert_eq!(events.tick, a.state().tick());
            b.tick_with_sink(&mut NullSink);
        }
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_bincode_round_trip_continues_stream() {
        let mut original = sim(5);
        original.run(120);
        let bytes = original.serialize().unwrap();
        let mut restored = Simulation::deserialize(Arc::clone(original.catalog()), &bytes).unwrap();
        assert_eq!(restored.state_hash(), original.state_hash());

        original.run(300);
        restored.run(300);
        assert_eq!(restored.state_hash(), original.state_hash());
    }

    #[test]
    fn test_bad_bytes_are_an_error() {
        let err = Simulation::deserialize(Arc::new(catalog()), &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, GameError::InvalidState(_)));
    }

    #[test]
    fn test_advance_is_a_pure_step() {
        let catalog = catalog();
        let state = two_faction_world(&catalog);
        let mut rng_a = SimRng::seed_from_u64(9);
        let mut rng_b = SimRng::seed_from_u64(9);
        let (a, events_a) = advance(state.clone(), &catalog, &mut rng_a);
        let (b, events_b) = advance(state, &catalog, &mut rng_b);
        assert_eq!(a, b);
        assert_eq!(events_a, events_b);
        assert_eq!(a.tick(), 1);
    }

    #[test]
    fn test_attack_flash_expires_once_older_than_ttl() {
        let catalog = catalog();
        let mut state = two_faction_world(&catalog);
        state.attack_flashes.push(AttackFlash {
            from: TilePos::new(2, 2),
            to: TilePos::new(3, 2),
            tick: 0,
        });
        let mut rng = SimRng::seed_from_u64(2);
        for _ in 0..ATTACK_FLASH_TTL {
            step(&mut state, &catalog, &mut rng);
        }
        assert_eq!(state.tick(), ATTACK_FLASH_TTL);
        assert_eq!(state.attack_flashes().len(), 1);

        step(&mut state, &catalog, &mut rng);
        assert!(state.attack_flashes().is_empty());
    }
}
