//! Leader adventures.
//!
//! A settled leader occasionally leaves home as a hero unit, optionally
//! escorted. Adventurers stand at the settlement outside AI control
//! until their countdown runs out, then leave the map and may bring back
//! a lore relic.

use crate::components::UnitId;
use crate::events::{EventCategory, Notification};
use crate::factions::LeaderStatus;
use crate::simulation::TickContext;
use crate::state::GameState;

use super::primary_settlement;

/// Percent chance per cadence that a settled leader sets out.
pub const ADVENTURE_CHANCE_PERCENT: u32 = 10;

/// Length of an adventure in ticks.
pub const ADVENTURE_TICKS: u32 = 500;

/// Percent chance the hero brings an escort.
pub const ESCORT_CHANCE_PERCENT: u32 = 50;

/// Percent chance a returning hero found a lore item.
pub const LORE_CHANCE_PERCENT: u32 = 25;

/// Roll for an adventure. Returns the hero's unit id if one began.
pub fn run(state: &mut GameState, ctx: &mut TickContext<'_>, faction: &str) -> Option<UnitId> {
    let entry = state.factions.get(faction)?;
    if entry.leader_status != LeaderStatus::Settled {
        return None;
    }
    if !ctx.rng.percent(ADVENTURE_CHANCE_PERCENT) {
        return None;
    }
    begin_adventure(state, ctx, faction)
}

/// Spawn the hero (and maybe an escort) at the primary settlement.
pub(crate) fn begin_adventure(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    faction: &str,
) -> Option<UnitId> {
    let catalog = ctx.catalog;
    let leader = state.factions.get(faction)?.leader.clone();
    let (pos, _) = primary_settlement(state, catalog, faction)?;

    let hero = state.spawn_unit(catalog, &leader, faction, pos)?;
    if let Some(unit) = state.unit_at_mut(pos, hero) {
        unit.adventure = Some(ADVENTURE_TICKS);
    }

    let escort = catalog.get_faction(faction).and_then(|data| data.escort.as_deref());
    if let Some(kind) = escort {
        if ctx.rng.percent(ESCORT_CHANCE_PERCENT) {
            if let Some(id) = state.spawn_unit(catalog, kind, faction, pos) {
                if let Some(unit) = state.unit_at_mut(pos, id) {
                    unit.adventure = Some(ADVENTURE_TICKS);
                }
            }
        }
    }

    if let Some(entry) = state.factions.get_mut(faction) {
        entry.leader_status = LeaderStatus::Adventuring { hero };
    }
    tracing::debug!(faction, hero, "Leader set out on an adventure");
    state.log(
        EventCategory::Adventure,
        format!("The leader of {faction} set out on an adventure"),
        Some(pos),
    );
    ctx.notify(Notification::AdventureBegan {
        faction: faction.to_string(),
    });
    Some(hero)
}

/// Take an adventurer whose countdown expired off the map.
///
/// If it is the faction's leader, the leader is settled again and may
/// bring home a lore relic.
pub(crate) fn return_from_adventure(state: &mut GameState, ctx: &mut TickContext<'_>, unit: UnitId) {
    let Some(adventurer) = state.take_unit(unit) else {
        return;
    };
    let faction = adventurer.owner.clone();
    let is_leader = state.factions.get(&faction).is_some_and(|entry| {
        entry.leader_status == LeaderStatus::Adventuring { hero: unit }
    });
    if !is_leader {
        return;
    }

    let relic = if ctx.rng.percent(LORE_CHANCE_PERCENT) {
        let lore: Vec<&str> = ctx.catalog.lore_items().map(|item| item.id.as_str()).collect();
        ctx.rng.pick(&lore).map(|id| (*id).to_string())
    } else {
        None
    };

    if let Some(entry) = state.factions.get_mut(&faction) {
        entry.leader_status = LeaderStatus::Settled;
        if let Some(relic) = &relic {
            entry.relics.push(relic.clone());
        }
    }

    let message = match relic.as_deref().and_then(|id| ctx.catalog.get_item(id)) {
        Some(item) => format!("The leader of {faction} returned with the {}", item.name),
        None => format!("The leader of {faction} returned empty-handed"),
    };
    tracing::debug!(faction = %faction, relic = ?relic, "Leader returned");
    state.log(EventCategory::Adventure, message, Some(adventurer.pos));
    ctx.notify(Notification::AdventureEnded { faction, relic });
}

/// Settle a leader whose hero died while away.
pub(crate) fn hero_fell(state: &mut GameState, faction: &str, unit: UnitId) {
    if let Some(entry) = state.factions.get_mut(faction) {
        if entry.leader_status == (LeaderStatus::Adventuring { hero: unit }) {
            entry.leader_status = LeaderStatus::Settled;
        }
    }
}
