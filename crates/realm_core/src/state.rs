//! The complete world state advanced by the tick function.
//!
//! Fields are crate-private. Observers read through the accessor methods;
//! all mutation happens inside [`crate::simulation::advance`] or
//! [`crate::worldgen::WorldBuilder`].

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{UnitId, UnitInstance};
use crate::data::{Catalog, UnitRole, UnitStat};
use crate::events::{EventCategory, EventLog};
use crate::factions::{DiplomacyStatus, FactionId, FactionState};
use crate::grid::{Tile, TilePos, WorldGrid};
use crate::math::{fixed_serde, Fixed};
use crate::modifiers::{faction_modifier, ModifierQuery};

/// Ticks in one in-world year.
pub const TICK_PER_YEAR: u64 = 1000;

/// Ticks an attack flash stays visible.
pub const ATTACK_FLASH_TTL: u64 = 5;

/// Ticks a dead unit stays in the dying list.
pub const DYING_TTL: u64 = 25;

/// Narrative era, derived from the year. Flavor only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Epoch {
    /// Years 0-9.
    Founding,
    /// Years 10-49.
    Expansion,
    /// Years 50-199.
    Ascendancy,
    /// Year 200 onward.
    Twilight,
}

impl Epoch {
    /// Era for a year.
    #[must_use]
    pub const fn from_year(year: u64) -> Self {
        match year {
            0..=9 => Self::Founding,
            10..=49 => Self::Expansion,
            50..=199 => Self::Ascendancy,
            _ => Self::Twilight,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Founding => "Age of Founding",
            Self::Expansion => "Age of Expansion",
            Self::Ascendancy => "Age of Ascendancy",
            Self::Twilight => "Age of Twilight",
        }
    }
}

/// Transient marker for a recent exchange of blows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackFlash {
    /// Attacker tile.
    pub from: TilePos,
    /// Defender tile.
    pub to: TilePos,
    /// Tick of the exchange.
    pub tick: u64,
}

/// A recently killed unit, kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DyingUnit {
    /// The unit as it was when it died.
    pub unit: UnitInstance,
    /// Tick of death.
    pub death_tick: u64,
}

/// The whole simulated world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameState {
    pub(crate) grid: WorldGrid,
    pub(crate) factions: BTreeMap<FactionId, FactionState>,
    pub(crate) tick: u64,
    pub(crate) year: u64,
    pub(crate) cursor: Option<TilePos>,
    pub(crate) next_unit_id: UnitId,
    pub(crate) attack_flashes: Vec<AttackFlash>,
    pub(crate) dying: Vec<DyingUnit>,
    pub(crate) log: EventLog,
    #[serde(with = "fixed_serde")]
    pub(crate) minted: Fixed,
    #[serde(with = "fixed_serde")]
    pub(crate) world_athar: Fixed,
}

impl GameState {
    pub(crate) fn new(grid: WorldGrid) -> Self {
        Self {
            grid,
            factions: BTreeMap::new(),
            tick: 0,
            year: 0,
            cursor: None,
            next_unit_id: 1,
            attack_flashes: Vec::new(),
            dying: Vec::new(),
            log: EventLog::new(),
            minted: Fixed::ZERO,
            world_athar: Fixed::ZERO,
        }
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current year.
    #[must_use]
    pub const fn year(&self) -> u64 {
        self.year
    }

    /// Current narrative era.
    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        Epoch::from_year(self.year)
    }

    /// The grid.
    #[must_use]
    pub const fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    /// Tile at `pos`.
    #[must_use]
    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.grid.get(pos)
    }

    /// Units standing on `pos`.
    #[must_use]
    pub fn units_at(&self, pos: TilePos) -> &[UnitInstance] {
        self.grid.get(pos).map_or(&[], |tile| tile.units.as_slice())
    }

    /// Every live unit, row-major by tile.
    pub fn units(&self) -> impl Iterator<Item = &UnitInstance> {
        self.grid.tiles().flat_map(|tile| tile.units.iter())
    }

    /// Live unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&UnitInstance> {
        self.units().find(|unit| unit.id == id)
    }

    /// Faction by id.
    #[must_use]
    pub fn faction(&self, id: &str) -> Option<&FactionState> {
        self.factions.get(id)
    }

    /// All factions in id order.
    pub fn factions(&self) -> impl Iterator<Item = &FactionState> {
        self.factions.values()
    }

    /// The event log.
    #[must_use]
    pub const fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Recently killed units.
    #[must_use]
    pub fn dying(&self) -> &[DyingUnit] {
        &self.dying
    }

    /// Recent attack markers.
    #[must_use]
    pub fn attack_flashes(&self) -> &[AttackFlash] {
        &self.attack_flashes
    }

    /// UI selection cursor, passed through untouched.
    #[must_use]
    pub const fn cursor(&self) -> Option<TilePos> {
        self.cursor
    }

    /// Total currency ever minted.
    #[must_use]
    pub const fn minted(&self) -> Fixed {
        self.minted
    }

    /// World-wide Athar accumulator.
    #[must_use]
    pub const fn world_athar(&self) -> Fixed {
        self.world_athar
    }

    /// Id the next spawned unit will get.
    #[must_use]
    pub const fn next_unit_id(&self) -> UnitId {
        self.next_unit_id
    }

    /// Root tiles of the faction's settlements, row-major.
    #[must_use]
    pub fn settlement_tiles(&self, catalog: &Catalog, faction: &str) -> Vec<TilePos> {
        self.grid
            .tiles()
            .filter(|tile| tile.is_owned_by(faction))
            .filter(|tile| {
                tile.infrastructure
                    .as_deref()
                    .and_then(|id| catalog.get_infrastructure(id))
                    .is_some_and(|infra| infra.is_settlement())
            })
            .map(|tile| tile.pos)
            .collect()
    }

    /// Sum of population capacity over the faction's settlements.
    #[must_use]
    pub fn settlement_capacity(&self, catalog: &Catalog, faction: &str) -> u32 {
        self.grid
            .tiles()
            .filter(|tile| tile.is_owned_by(faction))
            .filter_map(|tile| tile.infrastructure.as_deref())
            .filter_map(|id| catalog.get_infrastructure(id))
            .map(|infra| infra.population_capacity())
            .sum()
    }

    /// Live units owned by `faction`.
    #[must_use]
    pub fn unit_count(&self, faction: &str) -> usize {
        self.units().filter(|unit| unit.owner == faction).count()
    }

    /// Stat modifier for a unit owner, zero for the hostile faction.
    #[must_use]
    pub fn stat_modifier(&self, catalog: &Catalog, owner: &str, role: UnitRole, stat: UnitStat) -> i32 {
        self.factions.get(owner).map_or(0, |faction| {
            faction_modifier(catalog, faction, ModifierQuery::UnitStat(role, stat))
        })
    }

    /// Maximum hit points of a live unit.
    #[must_use]
    pub fn max_hp_of(&self, catalog: &Catalog, unit: &UnitInstance) -> Option<u32> {
        let def = catalog.get_unit(&unit.kind)?;
        let modifier = self.stat_modifier(catalog, &unit.owner, def.role, UnitStat::Hp);
        Some(unit.max_hp(def, catalog, modifier))
    }

    pub(crate) fn log(&mut self, category: EventCategory, message: impl Into<String>, location: Option<TilePos>) {
        self.log.push(self.tick, category, message, location);
    }

    /// Place a fresh unit at full health. `None` if the type or tile is unknown.
    pub(crate) fn spawn_unit(
        &mut self,
        catalog: &Catalog,
        kind: &str,
        owner: &str,
        pos: TilePos,
    ) -> Option<UnitId> {
        let Some(def) = catalog.get_unit(kind) else {
            tracing::warn!(unit = kind, "Skipping spawn of unknown unit type");
            return None;
        };
        if !self.grid.contains(pos) {
            return None;
        }
        let id = self.next_unit_id;
        let mut unit = UnitInstance::new(id, kind, owner, pos, 0);
        let modifier = self.stat_modifier(catalog, owner, def.role, UnitStat::Hp);
        unit.hp = unit.max_hp(def, catalog, modifier);

        let tile = self.grid.get_mut(pos)?;
        tile.units.push(unit);
        self.next_unit_id += 1;
        Some(id)
    }

    pub(crate) fn locate_unit(&self, id: UnitId) -> Option<TilePos> {
        self.unit(id).map(|unit| unit.pos)
    }

    pub(crate) fn unit_at_mut(&mut self, pos: TilePos, id: UnitId) -> Option<&mut UnitInstance> {
        self.grid
            .get_mut(pos)?
            .units
            .iter_mut()
            .find(|unit| unit.id == id)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut UnitInstance> {
        let pos = self.locate_unit(id)?;
        self.unit_at_mut(pos, id)
    }

    /// Remove a unit from its tile.
    pub(crate) fn take_unit(&mut self, id: UnitId) -> Option<UnitInstance> {
        let pos = self.locate_unit(id)?;
        let tile = self.grid.get_mut(pos)?;
        let index = tile.units.iter().position(|unit| unit.id == id)?;
        Some(tile.units.remove(index))
    }

    /// Move a unit to `to`, keeping its position field in sync.
    pub(crate) fn relocate_unit(&mut self, id: UnitId, to: TilePos) -> bool {
        if !self.grid.contains(to) {
            return false;
        }
        let Some(mut unit) = self.take_unit(id) else {
            return false;
        };
        unit.pos = to;
        match self.grid.get_mut(to) {
            Some(tile) => {
                tile.units.push(unit);
                true
            }
            None => false,
        }
    }

    /// Grant experience, fully healing the unit if it levels up.
    ///
    /// Returns the number of levels gained.
    pub(crate) fn award_experience(&mut self, catalog: &Catalog, id: UnitId, amount: u32) -> u32 {
        let Some(unit) = self.unit_mut(id) else {
            return 0;
        };
        let gained = unit.grant_experience(amount);
        if gained > 0 {
            let max = self.unit(id).and_then(|unit| self.max_hp_of(catalog, unit));
            if let (Some(max), Some(unit)) = (max, self.unit_mut(id)) {
                unit.hp = max;
            }
        }
        gained
    }

    /// Set the stance between two factions on both sides at once.
    pub(crate) fn set_status(&mut self, a: &str, b: &str, status: DiplomacyStatus) {
        if a == b || !self.factions.contains_key(a) || !self.factions.contains_key(b) {
            return;
        }
        for (from, to) in [(a, b), (b, a)] {
            if let Some(faction) = self.factions.get_mut(from) {
                faction.diplomacy.entry(to.to_string()).or_default().status = status;
            }
        }
    }

    /// List every violated invariant. Empty when the state is consistent.
    #[must_use]
    pub fn check_invariants(&self, catalog: &Catalog) -> Vec<String> {
        let mut problems = Vec::new();

        for faction in self.factions.values() {
            for (resource, amount) in faction.storage.stocks() {
                if let Some(tier) = catalog.resource_tier(resource) {
                    if amount > faction.storage.capacity(tier) {
                        problems.push(format!(
                            "{}: {resource} {amount} exceeds {tier:?} capacity {}",
                            faction.id,
                            faction.storage.capacity(tier)
                        ));
                    }
                }
                if amount < Fixed::ZERO {
                    problems.push(format!("{}: {resource} is negative", faction.id));
                }
            }

            let capacity = self.settlement_capacity(catalog, &faction.id);
            if faction.population > capacity {
                problems.push(format!(
                    "{}: population {} exceeds capacity {capacity}",
                    faction.id, faction.population
                ));
            }

            for (other, relation) in &faction.diplomacy {
                let mirrored = self
                    .factions
                    .get(other)
                    .and_then(|o| o.diplomacy.get(&faction.id))
                    .map(|r| r.status);
                if mirrored != Some(relation.status) {
                    problems.push(format!(
                        "{} -> {other} is {:?} but mirror is {mirrored:?}",
                        faction.id, relation.status
                    ));
                }
            }
        }

        let mut seen = BTreeSet::new();
        for tile in self.grid.tiles() {
            for unit in &tile.units {
                if unit.pos != tile.pos {
                    problems.push(format!(
                        "unit {} at {:?} listed on tile {:?}",
                        unit.id, unit.pos, tile.pos
                    ));
                }
                if !seen.insert(unit.id) || unit.id >= self.next_unit_id {
                    problems.push(format!("unit id {} is duplicated or unassigned", unit.id));
                }
                if let Some(max) = self.max_hp_of(catalog, unit) {
                    if unit.hp > max {
                        problems.push(format!("unit {} hp {} above max {max}", unit.id, unit.hp));
                    }
                }
                if unit.hp == 0 {
                    problems.push(format!("dead unit {} still on the map", unit.id));
                }
            }
            if let Some(root) = tile.structure_root {
                let root_ok = self
                    .grid
                    .get(root)
                    .is_some_and(|r| r.infrastructure.is_some() && r.owner == tile.owner);
                if !root_ok || tile.infrastructure.is_some() {
                    problems.push(format!("satellite {:?} has no valid root {root:?}", tile.pos));
                }
            }
            let size = tile
                .infrastructure
                .as_deref()
                .and_then(|id| catalog.get_infrastructure(id))
                .map_or(1, |infra| infra.size);
            for pos in WorldGrid::footprint(tile.pos, size) {
                if pos == tile.pos {
                    continue;
                }
                let covered = self
                    .grid
                    .get(pos)
                    .is_some_and(|t| t.structure_root == Some(tile.pos) && t.owner == tile.owner);
                if !covered {
                    problems.push(format!(
                        "structure at {:?} does not cover {pos:?}",
                        tile.pos
                    ));
                }
            }
        }

        problems
    }

    /// Deterministic digest of the full state.
    ///
    /// Identical states hash identically across runs and platforms.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
