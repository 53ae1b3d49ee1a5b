//! Capacity, symmetry, opinion bounds and death bookkeeping across long seeded runs.

use std::sync::Arc;

use proptest::prelude::*;
use realm_core::ai::diplomacy::{alliance_threshold, war_declaration_chance, war_threshold};
use realm_core::combat::{self, damage_dealt, MIN_DAMAGE};
use realm_core::data::{Catalog, ResourceTier};
use realm_core::factions::{DiplomacyStatus, Relation, Storage, MAX_OPINION, MIN_OPINION};
use realm_core::grid::TilePos;
use realm_core::math::Fixed;
use realm_core::rng::SimRng;
use realm_core::simulation::{self, Simulation, TickContext};
use realm_core::state::DYING_TTL;
use realm_core::worldgen::WorldBuilder;
use realm_test_utils::determinism::strategies;
use realm_test_utils::fixtures::{
    generated_simulation, shipped_config, simulation, test_catalog,
};
use realm_test_utils::invariants::{assert_invariants, run_checked};

fn hawkish(mut catalog: Catalog) -> Catalog {
    for faction in &mut catalog.factions {
        faction.personality.aggression = 10;
        faction.personality.expansion = 10;
    }
    catalog
}

#[test]
fn two_factions_stay_consistent_for_three_years() {
    let mut sim = simulation(2024);
    run_checked(&mut sim, 3_000);
    assert_eq!(sim.state().year(), 3);
}

#[test]
fn generated_world_stays_consistent() {
    let mut sim = generated_simulation(&shipped_config(), 8);
    run_checked(&mut sim, 2_500);
}

#[test]
fn wars_stay_mirrored() {
    let catalog = Arc::new(hawkish(test_catalog()));
    let mut world = WorldBuilder::new(&catalog, 8, 6, "plains").unwrap();
    world
        .faction("red")
        .unwrap()
        .faction("blue")
        .unwrap()
        .opinion("red", "blue", -90)
        .unwrap()
        .opinion("blue", "red", -90)
        .unwrap()
        .infrastructure(TilePos::new(2, 2), "village", "red")
        .unwrap()
        .infrastructure(TilePos::new(6, 3), "village", "blue")
        .unwrap();
    let initial = world.build();

    let mut saw_war = false;
    for seed in 0..8 {
        let mut sim = Simulation::new(Arc::clone(&catalog), initial.clone(), seed);
        for _ in 0..15_000 {
            sim.tick();
            let red = sim.state().faction("red").unwrap();
            let blue = sim.state().faction("blue").unwrap();
            assert_eq!(red.status_toward("blue"), blue.status_toward("red"));
            saw_war |= red.status_toward("blue") == DiplomacyStatus::War;
        }
        assert_invariants(sim.state(), sim.catalog());
        if saw_war {
            break;
        }
    }
    assert!(saw_war, "opinion -90 with aggression 10 never went to war");
}

#[test]
fn dead_units_leave_the_dying_list_after_exactly_ttl_ticks() {
    let catalog = test_catalog();
    let mut world = WorldBuilder::new(&catalog, 8, 6, "plains").unwrap();
    world
        .faction("red")
        .unwrap()
        .faction("blue")
        .unwrap()
        .relation("red", "blue", DiplomacyStatus::War)
        .unwrap();
    let knight = world.unit("knight", "red", TilePos::new(3, 3)).unwrap();
    let worker = world.unit("worker", "blue", TilePos::new(4, 3)).unwrap();
    let mut state = world.build();
    let mut rng = SimRng::seed_from_u64(3);

    let mut ctx = TickContext::new(&catalog, &mut rng);
    let exchange = combat::engage(&mut state, &mut ctx, knight, worker).unwrap();
    assert!(exchange.defender_died);
    let death_tick = state.tick();
    assert_eq!(state.dying()[0].death_tick, death_tick);

    for _ in 1..DYING_TTL {
        simulation::step(&mut state, &catalog, &mut rng);
        assert_eq!(state.dying().len(), 1, "purged early at tick {}", state.tick());
    }
    simulation::step(&mut state, &catalog, &mut rng);
    assert_eq!(state.tick(), death_tick + DYING_TTL);
    assert!(state.dying().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn any_seed_keeps_invariants(seed in strategies::arb_seed()) {
        let mut sim = simulation(seed);
        run_checked(&mut sim, 700);
    }

    #[test]
    fn damage_is_never_below_floor(
        attack in 0i32..500,
        bonus in -200i32..300,
        reduction in -100i32..200,
    ) {
        prop_assert!(damage_dealt(Fixed::from_num(attack), bonus, reduction) >= MIN_DAMAGE);
    }

    #[test]
    fn opinion_stays_in_range(
        start in strategies::arb_opinion(),
        deltas in proptest::collection::vec(-250i32..250, 1..30),
    ) {
        let mut relation = Relation { status: DiplomacyStatus::Neutral, opinion: start };
        for delta in deltas {
            relation.adjust_opinion(delta);
            prop_assert!((MIN_OPINION..=MAX_OPINION).contains(&relation.opinion));
        }
    }

    #[test]
    fn stance_thresholds_follow_personality(
        personality in strategies::arb_personality(),
        opinion in strategies::arb_opinion(),
    ) {
        let war = war_threshold(personality.aggression);
        let alliance = alliance_threshold(personality.diplomacy);
        prop_assert!((MIN_OPINION..=MIN_OPINION + 60).contains(&war));
        prop_assert!((30..=80).contains(&alliance));
        prop_assert!(war < alliance);
        prop_assert!(war_threshold(personality.aggression + 1) >= war);
        prop_assert!(alliance_threshold(personality.diplomacy + 1) <= alliance);

        let neutral = Relation { status: DiplomacyStatus::Neutral, opinion };
        prop_assert_eq!(war_declaration_chance(&neutral, personality.aggression).is_some(), opinion < war);
        for status in [DiplomacyStatus::War, DiplomacyStatus::Alliance] {
            let relation = Relation { status, opinion };
            prop_assert!(war_declaration_chance(&relation, personality.aggression).is_none());
        }
    }

    #[test]
    fn storage_deposits_clamp_to_capacity(amounts in proptest::collection::vec(0u32..500, 1..20)) {
        let catalog = test_catalog();
        let mut storage = Storage::with_base_capacity(&catalog);
        let capacity = storage.capacity(ResourceTier::Raw);
        for amount in amounts {
            let before = storage.amount("wood");
            let stored = storage.deposit("wood", ResourceTier::Raw, Fixed::from_num(amount));
            prop_assert!(storage.amount("wood") <= capacity);
            prop_assert_eq!(storage.amount("wood") - before, stored);
        }
    }
}
