//! Small catalog and world shared by the unit tests.

use crate::data::Catalog;
use crate::grid::TilePos;
use crate::state::GameState;
use crate::worldgen::WorldBuilder;

const CATALOG: &str = include_str!("../../../assets/test/catalog.ron");

pub(crate) fn catalog() -> Catalog {
    let catalog = Catalog::from_ron_str(CATALOG).unwrap();
    assert!(catalog.validate().is_empty(), "{:?}", catalog.validate());
    catalog
}

/// An 8x6 plains world.
///
/// Red holds a village at (2,2), a lumber camp on wood at (3,2) and a
/// library at (2,3), with one worker at home. Blue holds a village at
/// (6,3) with one worker. Both are neutral at opinion 0 with 5 people.
pub(crate) fn two_faction_world(catalog: &Catalog) -> GameState {
    let mut world = WorldBuilder::new(catalog, 8, 6, "plains").unwrap();
    world.faction("red").unwrap().faction("blue").unwrap();
    world
        .deposit(TilePos::new(3, 2), "wood")
        .unwrap()
        .infrastructure(TilePos::new(2, 2), "village", "red")
        .unwrap()
        .infrastructure(TilePos::new(3, 2), "lumber_camp", "red")
        .unwrap()
        .infrastructure(TilePos::new(2, 3), "library", "red")
        .unwrap()
        .infrastructure(TilePos::new(6, 3), "village", "blue")
        .unwrap()
        .population("red", 5)
        .unwrap()
        .population("blue", 5)
        .unwrap();
    world.unit("worker", "red", TilePos::new(2, 2)).unwrap();
    world.unit("worker", "blue", TilePos::new(6, 3)).unwrap();
    world.build()
}
