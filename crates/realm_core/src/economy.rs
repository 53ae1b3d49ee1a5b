//! Resource production, depletion and deposit respawn.
//!
//! The production sweep runs every tick over owned root tiles in
//! row-major order. Extractors pull from the deposit under them and may
//! exhaust it; processors convert inputs into outputs only when every
//! input is covered. Production never exceeds storage capacity.

use std::collections::BTreeMap;

use crate::data::{Catalog, InfraKind, ResourceTier};
use crate::events::{EventCategory, Notification};
use crate::factions::FactionId;
use crate::grid::TilePos;
use crate::math::{apply_percent, Fixed};
use crate::modifiers::{faction_modifier, ModifierQuery};
use crate::simulation::TickContext;
use crate::state::GameState;

/// Percent chance an extractor exhausts its deposit per application.
pub const DEPLETION_CHANCE_PERCENT: u32 = 5;

/// Outcome of one structure's production step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionOutcome {
    /// Nothing happened (wrong deposit, short inputs, passive structure).
    Idle,
    /// Output was stored (possibly zero if storage is full).
    Produced {
        /// Amount actually stored.
        stored: Fixed,
        /// Whether the deposit ran dry this application.
        depleted: bool,
    },
}

/// Apply every owned structure's production rule once.
pub fn production_sweep(state: &mut GameState, ctx: &mut TickContext<'_>) {
    let sites: Vec<(TilePos, FactionId, String)> = state
        .grid
        .tiles()
        .filter_map(|tile| {
            let owner = tile.owner.clone()?;
            let infra = tile.infrastructure.clone()?;
            Some((tile.pos, owner, infra))
        })
        .collect();

    for (pos, owner, infra_id) in sites {
        let Some(infra) = ctx.catalog.get_infrastructure(&infra_id) else {
            tracing::warn!(infra = %infra_id, x = pos.x, y = pos.y, "Skipping unknown infrastructure");
            continue;
        };
        match &infra.kind {
            InfraKind::Extractor { resource, amount } => {
                extract(state, ctx, pos, &owner, resource, *amount);
            }
            InfraKind::Processor {
                inputs,
                output,
                amount,
            } => {
                process(state, ctx.catalog, &owner, inputs, output, *amount);
            }
            InfraKind::Settlement { .. } | InfraKind::Facility => {}
        }
    }
}

fn production_amount(
    state: &GameState,
    catalog: &Catalog,
    owner: &str,
    tier: ResourceTier,
    amount: u32,
) -> Option<Fixed> {
    let faction = state.factions.get(owner)?;
    let bonus = faction_modifier(catalog, faction, ModifierQuery::Production(tier));
    Some(apply_percent(Fixed::from_num(amount), bonus))
}

/// Run an extractor at `pos`.
pub(crate) fn extract(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    pos: TilePos,
    owner: &str,
    resource: &str,
    amount: u32,
) -> ProductionOutcome {
    let has_deposit = state
        .grid
        .get(pos)
        .is_some_and(|tile| tile.resource.as_deref() == Some(resource));
    if !has_deposit {
        return ProductionOutcome::Idle;
    }
    let Some(def) = ctx.catalog.get_resource(resource) else {
        tracing::warn!(resource, "Skipping extractor for unknown resource");
        return ProductionOutcome::Idle;
    };
    let Some(produced) = production_amount(state, ctx.catalog, owner, def.tier, amount) else {
        return ProductionOutcome::Idle;
    };
    let stored = match state.factions.get_mut(owner) {
        Some(faction) => faction.storage.deposit(resource, def.tier, produced),
        None => return ProductionOutcome::Idle,
    };

    let depleted = ctx.rng.percent(DEPLETION_CHANCE_PERCENT);
    if depleted {
        let tick = state.tick;
        if let Some(tile) = state.grid.get_mut(pos) {
            tile.resource = None;
            tile.respawn_at = Some(tick + def.respawn_time);
        }
        tracing::debug!(resource, x = pos.x, y = pos.y, "Deposit exhausted");
        state.log(
            EventCategory::Economy,
            format!("The {} deposit worked by {owner} ran dry", def.name),
            Some(pos),
        );
        ctx.notify(Notification::DepositExhausted { pos });
    }
    ProductionOutcome::Produced { stored, depleted }
}

/// Run a processor owned by `owner`.
pub(crate) fn process(
    state: &mut GameState,
    catalog: &Catalog,
    owner: &str,
    inputs: &BTreeMap<String, u32>,
    output: &str,
    amount: u32,
) -> ProductionOutcome {
    let Some(def) = catalog.get_resource(output) else {
        tracing::warn!(resource = output, "Skipping processor for unknown output");
        return ProductionOutcome::Idle;
    };
    let Some(produced) = production_amount(state, catalog, owner, def.tier, amount) else {
        return ProductionOutcome::Idle;
    };
    let Some(faction) = state.factions.get_mut(owner) else {
        return ProductionOutcome::Idle;
    };
    let cost: BTreeMap<String, Fixed> = inputs
        .iter()
        .map(|(id, n)| (id.clone(), Fixed::from_num(*n)))
        .collect();
    if faction.storage.spend(&cost).is_err() {
        return ProductionOutcome::Idle;
    }
    let stored = faction.storage.deposit(output, def.tier, produced);
    if def.mint {
        state.minted += stored;
    }
    ProductionOutcome::Produced {
        stored,
        depleted: false,
    }
}

/// Let cooled-down tiles roll for a fresh deposit.
///
/// The candidate is drawn uniformly from the biome's deposit list, then
/// kept with the resource's rarity chance. A failed roll leaves the tile
/// eligible for the next sweep.
pub fn respawn_sweep(state: &mut GameState, ctx: &mut TickContext<'_>) {
    let tick = state.tick;
    let mut regrown = Vec::new();
    for tile in state.grid.tiles_mut() {
        if tile.resource.is_some() || !tile.respawn_at.is_some_and(|at| at <= tick) {
            continue;
        }
        let Some(biome) = ctx.catalog.get_biome(&tile.biome) else {
            continue;
        };
        let Some(candidate) = ctx.rng.pick(&biome.deposits) else {
            continue;
        };
        let Some(resource) = ctx.catalog.get_resource(candidate) else {
            continue;
        };
        if ctx.rng.percent(resource.rarity.spawn_chance()) {
            tile.resource = Some(resource.id.clone());
            tile.respawn_at = None;
            regrown.push((tile.pos, resource.id.clone()));
        }
    }
    for (pos, resource) in regrown {
        tracing::debug!(resource = %resource, x = pos.x, y = pos.y, "Deposit respawned");
    }
}

/// Recompute storage capacity from base values plus owned structures.
pub fn recalculate_storage(state: &mut GameState, catalog: &Catalog, faction: &str) {
    let mut capacity: BTreeMap<ResourceTier, Fixed> = ResourceTier::ALL
        .iter()
        .map(|tier| (*tier, Fixed::from_num(catalog.base_storage(*tier))))
        .collect();
    for tile in state.grid.tiles().filter(|tile| tile.is_owned_by(faction)) {
        let Some(infra) = tile
            .infrastructure
            .as_deref()
            .and_then(|id| catalog.get_infrastructure(id))
        else {
            continue;
        };
        for (tier, bonus) in &infra.storage {
            *capacity.entry(*tier).or_insert(Fixed::ZERO) += Fixed::from_num(*bonus);
        }
    }
    if let Some(state) = state.factions.get_mut(faction) {
        state.storage.set_capacity(capacity, catalog);
    }
}
