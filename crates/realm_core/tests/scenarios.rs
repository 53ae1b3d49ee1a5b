//! Hand-built scenarios for upgrades, combat, capped production and war odds.

use std::sync::Arc;

use realm_core::ai::{diplomacy, management};
use realm_core::combat;
use realm_core::data::{Catalog, ResourceTier};
use realm_core::economy;
use realm_core::events::Notification;
use realm_core::factions::{DiplomacyStatus, Relation};
use realm_core::grid::TilePos;
use realm_core::math::ratio;
use realm_core::rng::SimRng;
use realm_core::simulation::{Simulation, TickContext, MANAGEMENT_PERIOD};
use realm_core::state::GameState;
use realm_core::worldgen::WorldBuilder;
use realm_test_utils::fixtures::{fixed, shipped_catalog, test_catalog};
use realm_test_utils::invariants::assert_invariants;

fn red_village(catalog: &Catalog, wood: u32, population: u32) -> GameState {
    let mut world = WorldBuilder::new(catalog, 8, 6, "plains").unwrap();
    world
        .faction("red")
        .unwrap()
        .infrastructure(TilePos::new(2, 2), "village", "red")
        .unwrap()
        .stock("red", "wood", wood)
        .unwrap()
        .population("red", population)
        .unwrap();
    world.build()
}

#[test]
fn upgrade_spends_cost_once_at_management_cadence() {
    let catalog = test_catalog();
    // village capacity 20, 17 people is 85%
    let mut state = red_village(&catalog, 100, 17);
    let mut rng = SimRng::seed_from_u64(1);
    let mut ctx = TickContext::new(&catalog, &mut rng);

    let report = management::run(&mut state, &mut ctx, "red");

    assert_eq!(report.upgraded, Some(TilePos::new(2, 2)));
    assert_eq!(report.trained, None);
    assert_eq!(
        state.tile(TilePos::new(2, 2)).unwrap().infrastructure.as_deref(),
        Some("town")
    );
    let red = state.faction("red").unwrap();
    assert_eq!(red.storage.amount("wood"), fixed(20));

    let again = management::run(&mut state, &mut ctx, "red");
    assert_eq!(again.upgraded, None);
    assert_eq!(state.faction("red").unwrap().storage.amount("wood"), fixed(20));
}

#[test]
fn upgrade_waits_for_population() {
    let catalog = test_catalog();
    let mut state = red_village(&catalog, 100, 15);
    let mut rng = SimRng::seed_from_u64(1);
    let mut ctx = TickContext::new(&catalog, &mut rng);

    assert_eq!(management::run(&mut state, &mut ctx, "red").upgraded, None);
    assert_eq!(state.faction("red").unwrap().storage.amount("wood"), fixed(100));
}

#[test]
fn upgrade_fires_first_on_the_management_tick() {
    let catalog = Arc::new(test_catalog());
    // a single tile leaves expansion nowhere to build
    let mut world = WorldBuilder::new(&catalog, 1, 1, "plains").unwrap();
    world
        .faction("red")
        .unwrap()
        .infrastructure(TilePos::new(0, 0), "village", "red")
        .unwrap()
        .stock("red", "wood", 150)
        .unwrap()
        .population("red", 17)
        .unwrap();
    let state = world.build();
    let mut sim = Simulation::new(Arc::clone(&catalog), state, 5);

    let upgraded = |events: &[Notification]| {
        events
            .iter()
            .any(|n| matches!(n, Notification::SettlementUpgraded { .. }))
    };
    for _ in 1..MANAGEMENT_PERIOD {
        let events = sim.tick();
        assert!(
            !upgraded(events.notifications.as_slice()),
            "upgrade at tick {}",
            events.tick
        );
    }
    assert_eq!(
        sim.state().tile(TilePos::new(0, 0)).unwrap().infrastructure.as_deref(),
        Some("village")
    );

    let events = sim.tick();
    assert_eq!(events.tick, MANAGEMENT_PERIOD);
    assert!(upgraded(events.notifications.as_slice()));
    assert_eq!(
        sim.state().tile(TilePos::new(0, 0)).unwrap().infrastructure.as_deref(),
        Some("town")
    );
    assert_invariants(sim.state(), &catalog);
}

fn ironhold_town(catalog: &Catalog, blocker: Option<TilePos>) -> GameState {
    let mut world = WorldBuilder::new(catalog, 10, 10, "plains").unwrap();
    world
        .faction("ironhold")
        .unwrap()
        .infrastructure(TilePos::new(4, 4), "town", "ironhold")
        .unwrap();
    if let Some(pos) = blocker {
        world.infrastructure(pos, "lumber_camp", "ironhold").unwrap();
    }
    world
        .stock("ironhold", "brick", 90)
        .unwrap()
        .stock("ironhold", "tools", 40)
        .unwrap()
        .stock("ironhold", "coin", 10)
        .unwrap()
        .population("ironhold", 180)
        .unwrap();
    world.build()
}

#[test]
fn town_to_city_claims_the_whole_footprint() {
    let catalog = shipped_catalog();
    let mut state = ironhold_town(&catalog, None);
    let mut rng = SimRng::seed_from_u64(3);
    let mut ctx = TickContext::new(&catalog, &mut rng);

    let report = management::run(&mut state, &mut ctx, "ironhold");

    assert_eq!(report.upgraded, Some(TilePos::new(4, 4)));
    let root = TilePos::new(4, 4);
    assert_eq!(state.tile(root).unwrap().infrastructure.as_deref(), Some("city"));
    let covered: Vec<TilePos> = state
        .grid()
        .tiles()
        .filter(|tile| state.grid().root_of(tile.pos) == root && tile.is_owned_by("ironhold"))
        .map(|tile| tile.pos)
        .collect();
    assert_eq!(covered.len(), 4, "{covered:?}");
    for pos in [TilePos::new(5, 4), TilePos::new(4, 5), TilePos::new(5, 5)] {
        assert_eq!(state.tile(pos).unwrap().structure_root, Some(root));
    }
    assert!(state.check_invariants(&catalog).is_empty());
    assert_eq!(state.faction("ironhold").unwrap().storage.amount("brick"), fixed(0));
}

#[test]
fn blocked_city_footprint_skips_the_upgrade() {
    let catalog = shipped_catalog();
    let mut state = ironhold_town(&catalog, Some(TilePos::new(5, 5)));
    let mut rng = SimRng::seed_from_u64(3);
    let mut ctx = TickContext::new(&catalog, &mut rng);

    let report = management::run(&mut state, &mut ctx, "ironhold");

    assert_eq!(report.upgraded, None);
    assert_eq!(
        state.tile(TilePos::new(4, 4)).unwrap().infrastructure.as_deref(),
        Some("town")
    );
    assert!(state.tile(TilePos::new(5, 4)).unwrap().owner.is_none());
    assert_eq!(state.faction("ironhold").unwrap().storage.amount("brick"), fixed(90));
    assert!(state.check_invariants(&catalog).is_empty());
}

fn battlefield(catalog: &Catalog, red: &str, blue: &str) -> (GameState, u64, u64) {
    let mut world = WorldBuilder::new(catalog, 8, 6, "plains").unwrap();
    world
        .faction("red")
        .unwrap()
        .faction("blue")
        .unwrap()
        .relation("red", "blue", DiplomacyStatus::War)
        .unwrap();
    let a = world.unit(red, "red", TilePos::new(3, 3)).unwrap();
    let b = world.unit(blue, "blue", TilePos::new(4, 3)).unwrap();
    (world.build(), a, b)
}

#[test]
fn units_at_war_both_take_damage() {
    let catalog = test_catalog();
    let (mut state, red, blue) = battlefield(&catalog, "soldier", "soldier");
    let mut rng = SimRng::seed_from_u64(9);
    let mut ctx = TickContext::new(&catalog, &mut rng);

    let exchange = combat::engage(&mut state, &mut ctx, red, blue).unwrap();

    assert!(exchange.dealt >= 1);
    assert!(exchange.received.is_some_and(|d| d >= 1));
    assert!(state.unit(red).unwrap().hp < 30);
    assert!(state.unit(blue).unwrap().hp < 30);
    assert_eq!(state.attack_flashes().len(), 1);
    assert_eq!(ctx.notifications.len(), 1);
}

#[test]
fn killing_blow_removes_victim_and_credits_one_kill() {
    let catalog = test_catalog();
    let (mut state, knight, worker) = battlefield(&catalog, "knight", "worker");
    let mut rng = SimRng::seed_from_u64(2);
    let mut ctx = TickContext::new(&catalog, &mut rng);

    let exchange = combat::engage(&mut state, &mut ctx, knight, worker).unwrap();

    assert!(exchange.defender_died);
    assert!(!exchange.attacker_died);
    assert!(state.unit(worker).is_none());
    assert!(state.units_at(TilePos::new(4, 3)).is_empty());
    let victor = state.unit(knight).unwrap();
    assert_eq!(victor.kills, 1);
    assert_eq!(victor.xp, combat::KILL_EXPERIENCE_PER_TIER);

    assert_eq!(state.dying().len(), 1);
    assert_eq!(state.dying()[0].unit.id, worker);
    assert_eq!(state.dying()[0].death_tick, state.tick());
}

#[test]
fn full_storage_clamps_production_but_still_rolls_depletion() {
    let catalog = test_catalog();
    let mut world = WorldBuilder::new(&catalog, 8, 6, "plains").unwrap();
    world
        .faction("red")
        .unwrap()
        .deposit(TilePos::new(3, 2), "wood")
        .unwrap()
        .infrastructure(TilePos::new(3, 2), "lumber_camp", "red")
        .unwrap()
        .stock("red", "wood", 100)
        .unwrap();
    let mut state = world.build();
    // no settlement, so capacity is the catalog base
    let capacity = state.faction("red").unwrap().storage.capacity(ResourceTier::Raw);
    assert_eq!(capacity, fixed(100));
    assert_eq!(state.faction("red").unwrap().storage.amount("wood"), capacity);

    let mut rng = SimRng::seed_from_u64(4);
    let mut depleted_after = None;
    for round in 1..=400 {
        let mut ctx = TickContext::new(&catalog, &mut rng);
        economy::production_sweep(&mut state, &mut ctx);
        assert_eq!(state.faction("red").unwrap().storage.amount("wood"), capacity);
        if state.tile(TilePos::new(3, 2)).unwrap().resource.is_none() {
            depleted_after = Some(round);
            break;
        }
    }
    assert!(depleted_after.is_some(), "deposit never ran dry");
    assert!(state.tile(TilePos::new(3, 2)).unwrap().respawn_at.is_some());
}

fn hawkish_catalog() -> Catalog {
    let mut catalog = test_catalog();
    for faction in &mut catalog.factions {
        faction.personality.aggression = 10;
    }
    catalog
}

#[test]
fn war_chance_at_threshold_is_two_percent() {
    let relation = Relation {
        status: DiplomacyStatus::Neutral,
        opinion: -100 + 10 * 6 - 1,
    };
    assert_eq!(diplomacy::war_threshold(10), -40);
    assert_eq!(
        diplomacy::war_declaration_chance(&relation, 10),
        Some(ratio(10, 500))
    );
    let at_threshold = Relation {
        opinion: -40,
        ..relation
    };
    assert_eq!(diplomacy::war_declaration_chance(&at_threshold, 10), None);
}

#[test]
fn war_declarations_happen_about_two_percent_of_the_time() {
    let catalog = hawkish_catalog();
    let mut world = WorldBuilder::new(&catalog, 8, 6, "plains").unwrap();
    world
        .faction("red")
        .unwrap()
        .faction("blue")
        .unwrap()
        .opinion("red", "blue", -41)
        .unwrap()
        .opinion("blue", "red", -41)
        .unwrap();
    let initial = world.build();

    let trials = 5_000;
    let mut wars = 0;
    let mut rng = SimRng::seed_from_u64(77);
    for _ in 0..trials {
        let mut state = initial.clone();
        let mut ctx = TickContext::new(&catalog, &mut rng);
        diplomacy::run(&mut state, &mut ctx, "red");
        let red = state.faction("red").unwrap();
        let blue = state.faction("blue").unwrap();
        assert_eq!(red.status_toward("blue"), blue.status_toward("red"));
        if red.status_toward("blue") == DiplomacyStatus::War {
            assert_eq!(red.diplomacy["blue"].opinion, -100);
            assert_eq!(blue.diplomacy["red"].opinion, -100);
            wars += 1;
        }
    }
    // expected 100, binomial sd is about 10
    assert!((60..=140).contains(&wars), "{wars} wars in {trials} trials");
}
