//! Settlement upgrades and unit training.

use crate::components::UnitId;
use crate::data::UnitRole;
use crate::events::{EventCategory, Notification};
use crate::grid::TilePos;
use crate::modifiers::modified_cost;
use crate::simulation::TickContext;
use crate::state::GameState;

use super::primary_settlement;

/// Population share of capacity (percent) required before upgrading.
pub const UPGRADE_POPULATION_PERCENT: u64 = 80;

/// What a management pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagementReport {
    /// Upgraded settlement tile, if any.
    pub upgraded: Option<TilePos>,
    /// Newly trained unit, if any.
    pub trained: Option<UnitId>,
}

/// Run one management pass: at most one upgrade, then at most one unit.
pub fn run(state: &mut GameState, ctx: &mut TickContext<'_>, faction: &str) -> ManagementReport {
    let upgraded = try_upgrade(state, ctx, faction);
    let trained = try_train(state, ctx, faction);
    ManagementReport { upgraded, trained }
}

fn try_upgrade(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    faction: &str,
) -> Option<TilePos> {
    let catalog = ctx.catalog;
    let capacity = state.settlement_capacity(catalog, faction);
    let entry = state.factions.get(faction)?;
    if u64::from(entry.population) * 100 < u64::from(capacity) * UPGRADE_POPULATION_PERCENT {
        return None;
    }

    let mut chosen = None;
    for pos in state.settlement_tiles(catalog, faction) {
        let Some(infra) = state
            .tile(pos)
            .and_then(|tile| tile.infrastructure.as_deref())
            .and_then(|id| catalog.get_infrastructure(id))
        else {
            continue;
        };
        let Some(path) = infra.upgrade() else {
            continue;
        };
        let Some(target) = catalog.get_infrastructure(&path.target) else {
            tracing::warn!(infra = %infra.id, target = %path.target, "Skipping upgrade to unknown target");
            continue;
        };
        let cost = modified_cost(catalog, entry, &path.cost);
        if !entry.storage.can_afford(&cost) {
            continue;
        }
        if target.size > infra.size {
            if let Err(e) = state.grid.check_growth(pos, target.size, faction) {
                tracing::debug!(faction, target = %target.id, error = %e, "Upgrade footprint blocked");
                continue;
            }
        }
        chosen = Some((pos, infra, target, cost));
        break;
    }
    let (pos, from, to, cost) = chosen?;

    state.factions.get_mut(faction)?.storage.spend(&cost).ok()?;
    if to.size > from.size {
        state.grid.grow_structure(pos, to.size, faction).ok()?;
    }
    if let Some(tile) = state.grid.get_mut(pos) {
        tile.infrastructure = Some(to.id.clone());
    }

    tracing::debug!(faction, from = %from.id, to = %to.id, x = pos.x, y = pos.y, "Settlement upgraded");
    state.log(
        EventCategory::Construction,
        format!("{faction} raised their {} into a {}", from.name, to.name),
        Some(pos),
    );
    ctx.notify(Notification::SettlementUpgraded {
        faction: faction.to_string(),
        pos,
    });
    Some(pos)
}

fn try_train(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    faction: &str,
) -> Option<UnitId> {
    let catalog = ctx.catalog;
    let capacity = state.settlement_capacity(catalog, faction);
    let fielded = state.unit_count(faction);
    let entry = state.factions.get(faction)?;
    let population = entry.population;
    if usize::try_from(population).unwrap_or(usize::MAX) <= fielded || population >= capacity {
        return None;
    }
    let (pos, tier) = primary_settlement(state, catalog, faction)?;
    let data = catalog.get_faction(faction)?;

    let candidates: Vec<_> = data
        .roster
        .iter()
        .filter_map(|id| catalog.get_unit(id))
        .filter(|def| def.role != UnitRole::Hero && def.tier <= tier)
        .filter_map(|def| {
            let cost = modified_cost(catalog, entry, &def.cost);
            entry.storage.can_afford(&cost).then_some((def, cost))
        })
        .collect();
    let (def, cost) = ctx.rng.pick(&candidates)?.clone();

    state.factions.get_mut(faction)?.storage.spend(&cost).ok()?;
    let id = state.spawn_unit(catalog, &def.id, faction, pos)?;
    if def.train_ticks > 0 {
        if let Some(unit) = state.unit_at_mut(pos, id) {
            unit.construction = Some(def.train_ticks);
        }
    }

    tracing::debug!(faction, unit = %def.id, id, "Unit trained");
    state.log(
        EventCategory::Construction,
        format!("{faction} trained a {}", def.name),
        Some(pos),
    );
    ctx.notify(Notification::UnitTrained { unit: id, pos });
    Some(id)
}
