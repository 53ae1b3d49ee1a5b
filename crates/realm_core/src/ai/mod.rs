//! Faction decision-making.
//!
//! Four independent behaviors run per faction at their own cadences:
//! [`management`] (settlement upgrades and training), [`leader`] (hero
//! adventures), [`diplomacy`] (opinion, war and alliance) and
//! [`expansion`] (new structures). Each one tries a single action and
//! silently gives up when it cannot afford it or finds no valid site;
//! the next cadence simply tries again.

pub mod diplomacy;
pub mod expansion;
pub mod leader;
pub mod management;

use crate::data::Catalog;
use crate::grid::TilePos;
use crate::state::GameState;

/// The faction's highest-tier settlement and its tier.
///
/// Ties go to the first settlement in row-major order.
#[must_use]
pub fn primary_settlement(state: &GameState, catalog: &Catalog, faction: &str) -> Option<(TilePos, u8)> {
    state
        .settlement_tiles(catalog, faction)
        .into_iter()
        .filter_map(|pos| {
            let tier = state
                .tile(pos)?
                .infrastructure
                .as_deref()
                .and_then(|id| catalog.get_infrastructure(id))?
                .settlement_tier();
            Some((pos, tier))
        })
        .fold(None, |best: Option<(TilePos, u8)>, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        })
}
