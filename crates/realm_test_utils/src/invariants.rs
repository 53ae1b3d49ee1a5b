//! Invariant assertions for long runs.
//!
//! [`GameState::check_invariants`] covers storage, population, relation
//! symmetry and unit bookkeeping. The helpers here add the transient
//! lists the engine trims itself (dying units, attack flashes, the event
//! log) and run checks after every tick.

use realm_core::data::Catalog;
use realm_core::events::EVENT_LOG_CAPACITY;
use realm_core::simulation::Simulation;
use realm_core::state::{GameState, ATTACK_FLASH_TTL, DYING_TTL};

/// Every problem found in `state`, engine checks first.
#[must_use]
pub fn collect_problems(state: &GameState, catalog: &Catalog) -> Vec<String> {
    let mut problems = state.check_invariants(catalog);
    let tick = state.tick();

    for dying in state.dying() {
        if tick.saturating_sub(dying.death_tick) >= DYING_TTL {
            problems.push(format!("unit {} dying since {}", dying.unit.id, dying.death_tick));
        }
        if state.unit(dying.unit.id).is_some() {
            problems.push(format!("dying unit {} still on the map", dying.unit.id));
        }
    }
    for flash in state.attack_flashes() {
        if tick.saturating_sub(flash.tick) > ATTACK_FLASH_TTL {
            problems.push(format!("attack flash from tick {} outlived its ttl", flash.tick));
        }
    }

    let log = state.event_log();
    if log.len() > EVENT_LOG_CAPACITY {
        problems.push(format!("event log holds {} entries", log.len()));
    }
    let ids: Vec<u64> = log.iter().map(|entry| entry.id).collect();
    if ids.windows(2).any(|w| w[0] <= w[1]) {
        problems.push(format!("event log not newest-first: {ids:?}"));
    }

    problems
}

/// Assert that `state` is consistent.
///
/// # Panics
///
/// Panics listing every violated invariant.
pub fn assert_invariants(state: &GameState, catalog: &Catalog) {
    let problems = collect_problems(state, catalog);
    for problem in &problems {
        tracing::error!(tick = state.tick(), problem = %problem, "Invariant violated");
    }
    assert!(
        problems.is_empty(),
        "tick {}: {} invariant(s) broken:\n  {}",
        state.tick(),
        problems.len(),
        problems.join("\n  ")
    );
}

/// Tick `sim` `ticks` times, asserting invariants after each tick.
///
/// # Panics
///
/// Panics at the first inconsistent tick.
pub fn run_checked(sim: &mut Simulation, ticks: u64) {
    for _ in 0..ticks {
        sim.tick();
        assert_invariants(sim.state(), sim.catalog());
    }
}
