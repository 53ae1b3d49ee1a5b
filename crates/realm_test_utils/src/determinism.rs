//! Harnesses that run the same world more than once and compare hashes.
//!
//! A world is a pure function of its catalog, its initial state and its
//! seed. The helpers here rerun a setup closure, step it in lockstep,
//! split a run through bincode or a JSON snapshot, or fan it out over
//! threads, and report whether every path ended on the same hash.
//!
//! Fixed-point math, ordered maps and a single seeded stream are what
//! make that hold; a failure here usually means one of them was bypassed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread;

use realm_core::data::Catalog;
use realm_core::simulation::Simulation;
use realm_core::snapshot::Snapshot;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Distinct final hashes, sorted.
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Panic with every hash unless all runs agreed.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Build `runs` states with `setup`, step each `ticks` times and hash
/// the results.
///
/// # Example
///
/// ```
/// use realm_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 10, || 0u64, |n| *n += 2, |n| *n);
/// result.assert_deterministic();
/// assert_eq!(result.hashes, vec![20, 20, 20]);
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run `runs` simulations built by `setup_fn` for `num_ticks` each and
/// collect their final hashes.
pub fn run_determinism_check<F>(setup_fn: F, runs: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        runs,
        num_ticks,
        setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
}

/// Run `setup` twice for `num_ticks` and compare final state hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    run_determinism_check(setup_fn, 2, num_ticks).is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches anything that leaks thread or allocation order into the state.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    sim.run(num_ticks);
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        tracing::warn!("Setup produced different initial states");
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        let (a, b) = (sim1.state_hash(), sim2.state_hash());
        if a != b {
            tracing::warn!(tick, first = a, second = b, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Check that a bincode round-trip at `split` continues identically.
///
/// Runs `split` ticks, serializes, restores, then runs both copies for
/// `tail` more ticks and compares hashes.
pub fn verify_serialization_determinism<F>(setup_fn: F, split: u64, tail: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    sim.run(split);

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(Arc::clone(sim.catalog()), &bytes) else {
        return false;
    };
    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    sim.run(tail);
    restored.run(tail);
    restored.state_hash() == sim.state_hash()
}

/// Same as [`verify_serialization_determinism`] through a JSON snapshot.
pub fn verify_snapshot_determinism<F>(setup_fn: F, split: u64, tail: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    sim.run(split);

    let Ok(text) = sim.snapshot().to_json() else {
        return false;
    };
    let catalog: Arc<Catalog> = Arc::clone(sim.catalog());
    let Ok(mut restored) = Snapshot::from_json(&text).and_then(|s| s.restore(catalog)) else {
        return false;
    };

    sim.run(tail);
    restored.run(tail);
    restored.state_hash() == sim.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use proptest::prelude::*;
    use realm_core::data::{Personality, ResourceTier, UnitRole, UnitStat, MAX_PERSONALITY};
    use realm_core::factions::{MAX_OPINION, MIN_OPINION};
    use realm_core::modifiers::TraitEffect;

    /// Any seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Opinion inside the legal range.
    pub fn arb_opinion() -> impl Strategy<Value = i32> {
        MIN_OPINION..=MAX_OPINION
    }

    /// Signed percent bonus, -100 to 200.
    pub fn arb_percent() -> impl Strategy<Value = i32> {
        -100i32..=200i32
    }

    /// Personality with every trait in range.
    pub fn arb_personality() -> impl Strategy<Value = Personality> {
        (0..=MAX_PERSONALITY, 0..=MAX_PERSONALITY, 0..=MAX_PERSONALITY).prop_map(
            |(aggression, diplomacy, expansion)| Personality {
                aggression,
                diplomacy,
                expansion,
            },
        )
    }

    /// Any resource tier.
    pub fn arb_tier() -> impl Strategy<Value = ResourceTier> {
        prop::sample::select(ResourceTier::ALL.to_vec())
    }

    /// Any unit role.
    pub fn arb_role() -> impl Strategy<Value = UnitRole> {
        prop_oneof![
            Just(UnitRole::Worker),
            Just(UnitRole::Soldier),
            Just(UnitRole::Hero),
            Just(UnitRole::Beast),
        ]
    }

    /// Any trait effect.
    pub fn arb_trait_effect() -> impl Strategy<Value = TraitEffect> {
        prop_oneof![
            (proptest::option::of(arb_tier()), arb_percent())
                .prop_map(|(tier, percent)| TraitEffect::Production { tier, percent }),
            arb_percent().prop_map(|percent| TraitEffect::Cost { percent }),
            (
                proptest::option::of(arb_role()),
                proptest::option::of(prop_oneof![Just(UnitStat::Attack), Just(UnitStat::Hp)]),
                arb_percent(),
            )
                .prop_map(|(role, stat, percent)| TraitEffect::UnitStat { role, stat, percent }),
            arb_percent().prop_map(|percent| TraitEffect::PopulationGrowth { percent }),
        ]
    }

    /// A list of trait effects.
    pub fn arb_effects(max_len: usize) -> impl Strategy<Value = Vec<TraitEffect>> {
        proptest::collection::vec(arb_trait_effect(), 0..max_len)
    }

    /// Run length in ticks, covering at least one slow cadence.
    pub fn arb_ticks() -> impl Strategy<Value = u64> {
        50u64..1_200u64
    }
}
