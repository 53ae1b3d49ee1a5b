//! The unit sweep: timers, regeneration, intents and steps.
//!
//! Units are visited in ascending id order. Each picks exactly one intent
//! with the priority aggress > harvest > patrol, proposes a single
//! orthogonal step, and realizes it with probability
//! `1 / destination.move_cost`. Stepping onto a tile holding a hostile
//! unit starts a fight instead of moving.

use crate::ai::leader;
use crate::combat;
use crate::components::{UnitId, UnitInstance};
use crate::data::{Catalog, InfraKind, ResourceTier, UnitRole};
use crate::factions::are_hostile;
use crate::grid::TilePos;
use crate::math::ratio;
use crate::rng::SimRng;
use crate::simulation::{TickContext, UNIT_PERIOD};
use crate::state::GameState;

/// How far a worker looks for an extractor to work.
pub const HARVEST_RADIUS: u32 = 5;
/// How far a fighter looks for an enemy.
pub const AGGRESS_RADIUS: u32 = 6;
/// Hit points regained per sweep, in percent of maximum.
pub const REGEN_PERCENT: u32 = 5;

/// What a unit wants to do this sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Close in on an enemy unit standing at the position.
    Aggress(UnitId, TilePos),
    /// Walk toward an extractor.
    Harvest(TilePos),
    /// Wander one tile.
    Patrol(TilePos),
    /// Stay put.
    Hold,
}

/// Run the whole unit sweep.
pub fn unit_sweep(state: &mut GameState, ctx: &mut TickContext<'_>) {
    advance_timers(state, ctx);
    regenerate(state, ctx.catalog);

    for id in sorted_ids(state) {
        let Some(unit) = state.unit(id) else {
            continue;
        };
        if unit.is_busy() {
            continue;
        }
        let intent = choose_intent(state, ctx.catalog, unit, ctx.rng);
        realize(state, ctx, id, intent);
    }
}

fn sorted_ids(state: &GameState) -> Vec<UnitId> {
    let mut ids: Vec<UnitId> = state.units().map(|unit| unit.id).collect();
    ids.sort_unstable();
    ids
}

/// Count down training and adventures by one cadence.
pub(crate) fn advance_timers(state: &mut GameState, ctx: &mut TickContext<'_>) {
    let step = u32::try_from(UNIT_PERIOD).unwrap_or(u32::MAX);
    let mut returning = Vec::new();
    for tile in state.grid.tiles_mut() {
        for unit in &mut tile.units {
            if let Some(left) = unit.construction {
                let left = left.saturating_sub(step);
                unit.construction = (left > 0).then_some(left);
            }
            if let Some(left) = unit.adventure {
                let left = left.saturating_sub(step);
                unit.adventure = Some(left);
                if left == 0 {
                    returning.push(unit.id);
                }
            }
        }
    }
    returning.sort_unstable();
    for id in returning {
        leader::return_from_adventure(state, ctx, id);
    }
}

/// Heal every wounded unit by a share of its maximum.
pub(crate) fn regenerate(state: &mut GameState, catalog: &Catalog) {
    let healed: Vec<(UnitId, u32)> = state
        .units()
        .filter_map(|unit| {
            let max = state.max_hp_of(catalog, unit)?;
            let regen = (max * REGEN_PERCENT / 100).max(1);
            let hp = unit.hp.saturating_add(regen).min(max);
            (hp != unit.hp).then_some((unit.id, hp))
        })
        .collect();
    for (id, hp) in healed {
        if let Some(unit) = state.unit_mut(id) {
            unit.hp = hp;
        }
    }
}

/// Nearest enemy within [`AGGRESS_RADIUS`], ties by row-major tile order
/// then unit id.
#[must_use]
pub fn nearest_enemy(state: &GameState, unit: &UnitInstance) -> Option<(UnitId, TilePos)> {
    state
        .grid
        .within(unit.pos, AGGRESS_RADIUS)
        .into_iter()
        .filter_map(|pos| {
            state
                .units_at(pos)
                .iter()
                .filter(|other| are_hostile(&state.factions, &unit.owner, &other.owner))
                .map(|other| other.id)
                .min()
                .map(|id| (id, pos))
        })
        .min_by_key(|(_, pos)| pos.distance(unit.pos))
}

fn nearest_extractor(state: &GameState, catalog: &Catalog, unit: &UnitInstance) -> Option<TilePos> {
    state
        .grid
        .within(unit.pos, HARVEST_RADIUS)
        .into_iter()
        .filter(|pos| {
            state.tile(*pos).is_some_and(|tile| {
                tile.is_owned_by(&unit.owner)
                    && tile
                        .infrastructure
                        .as_deref()
                        .and_then(|id| catalog.get_infrastructure(id))
                        .is_some_and(|infra| match &infra.kind {
                            InfraKind::Extractor { resource, .. } => {
                                catalog.resource_tier(resource) == Some(ResourceTier::Raw)
                            }
                            _ => false,
                        })
            })
        })
        .min_by_key(|pos| pos.distance(unit.pos))
}

/// Pick an intent for `unit`.
pub fn choose_intent(state: &GameState, catalog: &Catalog, unit: &UnitInstance, rng: &mut SimRng) -> Intent {
    let Some(def) = catalog.get_unit(&unit.kind) else {
        tracing::warn!(unit = %unit.kind, "Unknown unit type holds position");
        return Intent::Hold;
    };
    if def.can_fight() {
        if let Some((target, pos)) = nearest_enemy(state, unit) {
            return Intent::Aggress(target, pos);
        }
    }
    if def.role == UnitRole::Worker {
        if let Some(site) = nearest_extractor(state, catalog, unit) {
            return if site == unit.pos {
                Intent::Hold
            } else {
                Intent::Harvest(site)
            };
        }
    }
    match rng.pick(&state.grid.neighbors(unit.pos)) {
        Some(next) => Intent::Patrol(*next),
        None => Intent::Hold,
    }
}

fn enemy_on(state: &GameState, owner: &str, pos: TilePos) -> Option<UnitId> {
    state
        .units_at(pos)
        .iter()
        .filter(|other| are_hostile(&state.factions, owner, &other.owner))
        .map(|other| other.id)
        .min()
}

/// Carry out an intent: one step, or a fight.
pub(crate) fn realize(state: &mut GameState, ctx: &mut TickContext<'_>, id: UnitId, intent: Intent) {
    let Some(unit) = state.unit(id) else {
        return;
    };
    let from = unit.pos;
    let owner = unit.owner.clone();
    let to = match intent {
        Intent::Hold => return,
        Intent::Aggress(target, pos) if pos == from => {
            combat::engage(state, ctx, id, target);
            return;
        }
        Intent::Aggress(_, pos) | Intent::Harvest(pos) => from.step_toward(pos),
        Intent::Patrol(pos) => pos,
    };

    let Some(biome) = state.tile(to).and_then(|tile| ctx.catalog.get_biome(&tile.biome)) else {
        return;
    };
    if !biome.is_passable() || !ctx.rng.chance(ratio(1, biome.move_cost)) {
        return;
    }
    match enemy_on(state, &owner, to) {
        Some(enemy) => {
            combat::engage(state, ctx, id, enemy);
        }
        None => {
            state.relocate_unit(id, to);
        }
    }
}
