//! Test fixtures and helpers.
//!
//! Two catalogs are available: the small, hand-tuned test catalog whose
//! numbers the scenario tests rely on, and the catalog shipped under
//! `assets/data`, merged exactly as [`Catalog::load`] would merge the
//! directory.

use std::sync::Arc;

use fixed::types::I32F32;
use realm_core::data::Catalog;
use realm_core::grid::TilePos;
use realm_core::simulation::Simulation;
use realm_core::state::GameState;
use realm_core::worldgen::{generate_world, WorldBuilder, WorldConfig};

const TEST_CATALOG: &str = include_str!("../../../assets/test/catalog.ron");

/// Shipped catalog files, in file-name order.
const SHIPPED: [&str; 5] = [
    include_str!("../../../assets/data/factions.ron"),
    include_str!("../../../assets/data/infrastructure.ron"),
    include_str!("../../../assets/data/resources.ron"),
    include_str!("../../../assets/data/units.ron"),
    include_str!("../../../assets/data/world.ron"),
];

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// The small test catalog.
///
/// Factions `red` and `blue`, biomes `lake`/`plains`/`hills`, a village
/// that upgrades to a town at 80 wood, a lumber camp, a sawmill and a
/// library.
///
/// # Panics
///
/// Panics if the catalog fails to parse or validate.
#[must_use]
pub fn test_catalog() -> Catalog {
    let catalog = Catalog::from_ron_str(TEST_CATALOG).expect("test catalog parses");
    let problems = catalog.validate();
    assert!(problems.is_empty(), "test catalog invalid: {problems:?}");
    catalog
}

/// The catalog shipped with the game.
///
/// # Panics
///
/// Panics if any file fails to parse or the merged catalog is invalid.
#[must_use]
pub fn shipped_catalog() -> Catalog {
    let mut catalog = Catalog::default();
    for text in SHIPPED {
        catalog.merge(Catalog::from_ron_str(text).expect("shipped catalog parses"));
    }
    let problems = catalog.validate();
    assert!(problems.is_empty(), "shipped catalog invalid: {problems:?}");
    catalog
}

/// An 8x6 plains world over [`test_catalog`].
///
/// Red holds a village at (2,2), a lumber camp on wood at (3,2) and a
/// library at (2,3), with one worker at home. Blue holds a village at
/// (6,3) with one worker. Both start neutral at opinion 0 with 5 people.
///
/// # Panics
///
/// Panics if the catalog lacks the ids used here.
#[must_use]
pub fn two_faction_world(catalog: &Catalog) -> GameState {
    let mut world = WorldBuilder::new(catalog, 8, 6, "plains").expect("plains exists");
    world
        .faction("red")
        .and_then(|w| w.faction("blue"))
        .and_then(|w| w.deposit(TilePos::new(3, 2), "wood"))
        .and_then(|w| w.infrastructure(TilePos::new(2, 2), "village", "red"))
        .and_then(|w| w.infrastructure(TilePos::new(3, 2), "lumber_camp", "red"))
        .and_then(|w| w.infrastructure(TilePos::new(2, 3), "library", "red"))
        .and_then(|w| w.infrastructure(TilePos::new(6, 3), "village", "blue"))
        .and_then(|w| w.population("red", 5))
        .and_then(|w| w.population("blue", 5))
        .expect("two faction world");
    world
        .unit("worker", "red", TilePos::new(2, 2))
        .expect("red worker");
    world
        .unit("worker", "blue", TilePos::new(6, 3))
        .expect("blue worker");
    world.build()
}

/// Simulation of [`two_faction_world`] seeded with `seed`.
#[must_use]
pub fn simulation(seed: u64) -> Simulation {
    let catalog = Arc::new(test_catalog());
    let state = two_faction_world(&catalog);
    Simulation::new(catalog, state, seed)
}

/// A small generated world over the shipped catalog with every faction.
#[must_use]
pub fn shipped_config() -> WorldConfig {
    WorldConfig::small()
        .with_faction("ironhold")
        .with_faction("greenmantle")
        .with_faction("starfall")
}

/// Simulation of a generated world over the shipped catalog.
///
/// # Panics
///
/// Panics if generation fails.
#[must_use]
pub fn generated_simulation(config: &WorldConfig, seed: u64) -> Simulation {
    let catalog = Arc::new(shipped_catalog());
    let state = generate_world(&catalog, config, seed).expect("world generates");
    Simulation::new(catalog, state, seed)
}

/// Parse a [`WorldConfig`] written in RON.
///
/// # Panics
///
/// Panics on malformed input.
#[must_use]
pub fn world_config(ron_text: &str) -> WorldConfig {
    ron::from_str(ron_text).expect("world config parses")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogs_validate() {
        let test = test_catalog();
        assert!(test.get_faction("red").is_some());
        let shipped = shipped_catalog();
        assert_eq!(shipped.factions.len(), 3);
        assert!(shipped.base_storage.len() == 4);
    }

    #[test]
    fn test_shipped_directory_matches_embedded() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/data");
        let loaded = Catalog::load(dir).unwrap();
        let embedded = shipped_catalog();
        assert_eq!(loaded.units.len(), embedded.units.len());
        assert_eq!(loaded.infrastructure.len(), embedded.infrastructure.len());
        assert_eq!(loaded.hostiles, embedded.hostiles);
    }

    #[test]
    fn test_world_config_from_ron() {
        let config = world_config(
            r#"WorldConfig(width: 16, height: 12, factions: [FactionStart(id: "red", population: 8)])"#,
        );
        assert_eq!(config.feature_size, 6);
        assert_eq!(config.factions[0].population, 8);
        assert!(config.factions[0].position.is_none());
    }

    #[test]
    fn test_generated_simulation_places_every_faction() {
        let sim = generated_simulation(&shipped_config(), 99);
        let catalog = sim.catalog();
        for id in ["ironhold", "greenmantle", "starfall"] {
            assert!(sim.state().faction(id).is_some());
            assert_eq!(sim.state().settlement_tiles(catalog, id).len(), 1);
        }
    }
}
