//! Site selection and construction.
//!
//! Candidate sites are the unclaimed, unbuilt tiles orthogonally adjacent
//! to the faction's territory. A processor is preferred when its inputs
//! pile up and its output runs short; otherwise an extractor goes onto a
//! free deposit whose resource still has storage headroom.

use std::collections::BTreeMap;

use crate::data::{Catalog, FactionData, InfraKind, InfrastructureData, UnitRole, MAX_PERSONALITY};
use crate::events::{EventCategory, Notification};
use crate::factions::FactionState;
use crate::grid::TilePos;
use crate::math::{ratio, Fixed};
use crate::modifiers::modified_cost;
use crate::simulation::TickContext;
use crate::state::GameState;

/// Expansion chance per cadence is `expansion / EXPANSION_DIVISOR`.
pub const EXPANSION_DIVISOR: u32 = 20;
/// An input is abundant at this share (percent) of its tier capacity.
pub const ABUNDANT_PERCENT: u32 = 50;
/// An output is scarce below this share (percent) of its tier capacity.
pub const SCARCE_PERCENT: u32 = 25;
/// How far a worker may stand from a new site to claim the work.
pub const BUILDER_RADIUS: u32 = 3;
/// Experience credited to the builder.
pub const BUILD_EXPERIENCE: u32 = 5;

/// A chosen construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Root tile.
    pub pos: TilePos,
    /// Infrastructure id.
    pub infrastructure: String,
}

/// Roll the expansion chance and build at most one structure.
pub fn run(state: &mut GameState, ctx: &mut TickContext<'_>, faction: &str) -> Option<BuildPlan> {
    let catalog = ctx.catalog;
    let Some(data) = catalog.get_faction(faction) else {
        tracing::warn!(faction, "Skipping expansion for unknown faction");
        return None;
    };
    let chance = ratio(data.personality.expansion.min(MAX_PERSONALITY), EXPANSION_DIVISOR);
    if !ctx.rng.chance(chance) {
        return None;
    }
    let plan = choose_plan(state, ctx, data)?;
    build(state, ctx, faction, &plan).then_some(plan)
}

/// Unclaimed, unbuilt tiles next to the faction's territory, row-major.
#[must_use]
pub fn frontier(state: &GameState, faction: &str) -> Vec<TilePos> {
    state
        .grid
        .tiles()
        .filter(|tile| tile.owner.is_none() && !tile.is_built())
        .filter(|tile| {
            state
                .grid
                .neighbors(tile.pos)
                .into_iter()
                .any(|n| state.grid.get(n).is_some_and(|t| t.is_owned_by(faction)))
        })
        .map(|tile| tile.pos)
        .collect()
}

fn share_at_least(amount: Fixed, capacity: Fixed, percent: u32) -> bool {
    amount * Fixed::from_num(100) >= capacity * Fixed::from_num(percent)
}

fn processor_wanted(catalog: &Catalog, faction: &FactionState, infra: &InfrastructureData) -> bool {
    let InfraKind::Processor { inputs, output, .. } = &infra.kind else {
        return false;
    };
    let abundant = inputs.keys().all(|input| {
        catalog.resource_tier(input).is_some_and(|tier| {
            share_at_least(
                faction.storage.amount(input),
                faction.storage.capacity(tier),
                ABUNDANT_PERCENT,
            )
        })
    });
    let scarce = catalog.resource_tier(output).is_some_and(|tier| {
        !share_at_least(
            faction.storage.amount(output),
            faction.storage.capacity(tier),
            SCARCE_PERCENT,
        )
    });
    abundant && scarce
}

fn affordable(catalog: &Catalog, faction: &FactionState, infra: &InfrastructureData) -> Option<BTreeMap<String, Fixed>> {
    let cost = modified_cost(catalog, faction, &infra.cost);
    faction.storage.can_afford(&cost).then_some(cost)
}

/// Pick a construction target by priority, or `None`.
pub(crate) fn choose_plan(
    state: &GameState,
    ctx: &mut TickContext<'_>,
    data: &FactionData,
) -> Option<BuildPlan> {
    let catalog = ctx.catalog;
    let faction = state.factions.get(&data.id)?;
    let sites = frontier(state, &data.id);
    if sites.is_empty() {
        return None;
    }
    let buildable: Vec<&InfrastructureData> = data
        .buildable
        .iter()
        .filter_map(|id| catalog.get_infrastructure(id))
        .filter(|infra| affordable(catalog, faction, infra).is_some())
        .collect();

    let processor = buildable
        .iter()
        .find(|infra| processor_wanted(catalog, faction, infra));
    if let Some(infra) = processor {
        let valid: Vec<TilePos> = sites
            .iter()
            .copied()
            .filter(|pos| state.grid.check_placement(*pos, infra.size, &data.id).is_ok())
            .collect();
        if let Some(pos) = ctx.rng.pick(&valid) {
            return Some(BuildPlan {
                pos: *pos,
                infrastructure: infra.id.clone(),
            });
        }
    }

    let mut options = Vec::new();
    for pos in &sites {
        let Some(deposit) = state.grid.get(*pos).and_then(|tile| tile.resource.as_deref()) else {
            continue;
        };
        let Some(tier) = catalog.resource_tier(deposit) else {
            continue;
        };
        if faction.storage.headroom(deposit, tier) <= Fixed::ZERO {
            continue;
        }
        for infra in &buildable {
            let matches = matches!(&infra.kind, InfraKind::Extractor { resource, .. } if resource == deposit);
            if matches && state.grid.check_placement(*pos, infra.size, &data.id).is_ok() {
                options.push(BuildPlan {
                    pos: *pos,
                    infrastructure: infra.id.clone(),
                });
            }
        }
    }
    ctx.rng.pick(&options).cloned()
}

/// Pay for and place `plan`. Returns false if anything no longer fits.
pub(crate) fn build(state: &mut GameState, ctx: &mut TickContext<'_>, faction: &str, plan: &BuildPlan) -> bool {
    let catalog = ctx.catalog;
    let Some(infra) = catalog.get_infrastructure(&plan.infrastructure) else {
        return false;
    };
    let Some(cost) = state
        .factions
        .get(faction)
        .and_then(|entry| affordable(catalog, entry, infra))
    else {
        return false;
    };
    if let Err(err) = state.grid.check_placement(plan.pos, infra.size, faction) {
        tracing::debug!(faction, error = %err, "Abandoning construction");
        return false;
    }
    let paid = state
        .factions
        .get_mut(faction)
        .is_some_and(|entry| entry.storage.spend(&cost).is_ok());
    if !paid || state.grid.place_structure(plan.pos, infra.size, &infra.id, faction).is_err() {
        return false;
    }
    credit_builder(state, catalog, faction, plan.pos);

    tracing::debug!(faction, infra = %infra.id, x = plan.pos.x, y = plan.pos.y, "Structure built");
    state.log(
        EventCategory::Construction,
        format!("{faction} built a {}", infra.name),
        Some(plan.pos),
    );
    ctx.notify(Notification::BuildingCompleted {
        faction: faction.to_string(),
        pos: plan.pos,
    });
    true
}

fn credit_builder(state: &mut GameState, catalog: &Catalog, faction: &str, site: TilePos) {
    let builder = state
        .units()
        .filter(|unit| unit.owner == faction && !unit.is_busy())
        .filter(|unit| unit.pos.distance(site) <= BUILDER_RADIUS)
        .filter(|unit| {
            catalog
                .get_unit(&unit.kind)
                .is_some_and(|def| def.role == UnitRole::Worker)
        })
        .min_by_key(|unit| (unit.pos.distance(site), unit.id))
        .map(|unit| unit.id);
    if let Some(id) = builder {
        state.award_experience(catalog, id, BUILD_EXPERIENCE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ResourceTier;
    use crate::rng::SimRng;
    use crate::test_fixtures::{catalog, two_faction_world};

    #[test]
    fn test_frontier_is_adjacent_and_free() {
        let catalog = catalog();
        let state = two_faction_world(&catalog);
        let sites = frontier(&state, "red");
        assert!(!sites.is_empty());
        for pos in &sites {
            let tile = state.tile(*pos).unwrap();
            assert!(tile.owner.is_none() && !tile.is_built());
            assert!(state
                .grid()
                .neighbors(*pos)
                .iter()
                .any(|n| state.tile(*n).unwrap().is_owned_by("red")));
        }
        // the village at (2,2) borders (2,1)
        assert!(sites.contains(&TilePos::new(2, 1)));
    }

    #[test]
    fn test_extractor_goes_onto_free_deposit() {
        let catalog = catalog();
        let mut state = two_faction_world(&catalog);
        let deposit = TilePos::new(1, 2);
        if let Some(tile) = state.grid.get_mut(deposit) {
            tile.resource = Some("wood".to_string());
        }
        // below half capacity the sawmill is not wanted
        if let Some(red) = state.factions.get_mut("red") {
            let cost: BTreeMap<String, Fixed> =
                [("wood".to_string(), Fixed::from_num(40))].into_iter().collect();
            red.storage.spend(&cost).unwrap();
        }
        let data = catalog.get_faction("red").unwrap();
        let mut rng = SimRng::seed_from_u64(2);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let plan = choose_plan(&state, &mut ctx, data).unwrap();
        assert_eq!(plan.infrastructure, "lumber_camp");
        assert!(state.tile(plan.pos).unwrap().resource.as_deref() == Some("wood"));

        let wood_before = state.faction("red").unwrap().storage.amount("wood");
        assert!(build(&mut state, &mut ctx, "red", &plan));
        let tile = state.tile(plan.pos).unwrap();
        assert!(tile.is_owned_by("red"));
        assert_eq!(tile.infrastructure.as_deref(), Some("lumber_camp"));
        assert_eq!(
            state.faction("red").unwrap().storage.amount("wood"),
            wood_before - Fixed::from_num(10)
        );
        // the starting worker at (2,2) is within reach
        assert!(state.units().any(|u| u.owner == "red" && u.xp == BUILD_EXPERIENCE));
    }

    #[test]
    fn test_processor_preferred_when_inputs_pile_up() {
        let catalog = catalog();
        let mut state = two_faction_world(&catalog);
        if let Some(tile) = state.grid.get_mut(TilePos::new(1, 2)) {
            tile.resource = Some("wood".to_string());
        }
        // wood at 100 of 150 is abundant; planks are empty
        let data = catalog.get_faction("red").unwrap();
        let mut rng = SimRng::seed_from_u64(2);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let plan = choose_plan(&state, &mut ctx, data).unwrap();
        assert_eq!(plan.infrastructure, "sawmill");

        // once planks are plentiful the extractor wins again
        if let Some(red) = state.factions.get_mut("red") {
            red.storage.deposit("plank", ResourceTier::Processed, Fixed::from_num(40));
        }
        let plan = choose_plan(&state, &mut ctx, data).unwrap();
        assert_eq!(plan.infrastructure, "lumber_camp");
    }

    #[test]
    fn test_unaffordable_means_no_plan() {
        let catalog = catalog();
        let mut state = two_faction_world(&catalog);
        if let Some(tile) = state.grid.get_mut(TilePos::new(1, 2)) {
            tile.resource = Some("wood".to_string());
        }
        if let Some(red) = state.factions.get_mut("red") {
            let wood = red.storage.amount("wood");
            let cost: BTreeMap<String, Fixed> = [("wood".to_string(), wood)].into_iter().collect();
            red.storage.spend(&cost).unwrap();
        }
        let data = catalog.get_faction("red").unwrap();
        let mut rng = SimRng::seed_from_u64(2);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        assert_eq!(choose_plan(&state, &mut ctx, data), None);
    }
}
