//! Hostile spawns and world events.

use crate::events::{EventCategory, Notification};
use crate::factions::HOSTILE_FACTION;
use crate::grid::{Tile, TilePos, WorldEventMarker};
use crate::simulation::TickContext;
use crate::state::GameState;

/// Random tiles tried per spawn attempt.
pub const SPAWN_ATTEMPTS: u32 = 10;
/// No hostile spawns while this many hostiles are alive.
pub const MAX_HOSTILES: usize = 24;
/// Percent chance a world event is placed at its cadence.
pub const WORLD_EVENT_CHANCE_PERCENT: u32 = 50;

fn is_wild(tile: &Tile, ctx: &TickContext<'_>) -> bool {
    tile.owner.is_none()
        && !tile.is_built()
        && tile.units.is_empty()
        && tile.world_event.is_none()
        && ctx
            .catalog
            .get_biome(&tile.biome)
            .is_some_and(|biome| biome.is_passable())
}

fn find_site(state: &GameState, ctx: &mut TickContext<'_>) -> Option<TilePos> {
    let (width, height) = (state.grid.width(), state.grid.height());
    for _ in 0..SPAWN_ATTEMPTS {
        let pos = TilePos::new(ctx.rng.range(0, width), ctx.rng.range(0, height));
        if state.tile(pos).is_some_and(|tile| is_wild(tile, ctx)) {
            return Some(pos);
        }
    }
    None
}

/// Try to place one hostile unit on a wild tile.
pub fn spawn_hostile(state: &mut GameState, ctx: &mut TickContext<'_>) -> Option<TilePos> {
    if state.unit_count(HOSTILE_FACTION) >= MAX_HOSTILES {
        return None;
    }
    let kind = ctx.rng.pick(&ctx.catalog.hostiles)?.clone();
    let Some(pos) = find_site(state, ctx) else {
        tracing::debug!("No site for a hostile spawn");
        return None;
    };
    state.spawn_unit(ctx.catalog, &kind, HOSTILE_FACTION, pos)?;

    let name = ctx.catalog.get_unit(&kind).map_or(kind.as_str(), |def| def.name.as_str());
    state.log(EventCategory::World, format!("A {name} prowls the wilds"), Some(pos));
    ctx.notify(Notification::HostileSpawned { pos });
    Some(pos)
}

/// Maybe place a world event with its guardians and their loot.
pub fn place_world_event(state: &mut GameState, ctx: &mut TickContext<'_>) -> Option<TilePos> {
    if !ctx.rng.percent(WORLD_EVENT_CHANCE_PERCENT) {
        return None;
    }
    let catalog = ctx.catalog;
    let event = ctx.rng.pick(&catalog.world_events)?;
    let pos = find_site(state, ctx)?;

    let expires_at = state.tick + event.duration;
    if let Some(tile) = state.grid.get_mut(pos) {
        tile.world_event = Some(WorldEventMarker {
            id: event.id.clone(),
            expires_at,
        });
    }
    if let Some(kind) = &event.spawns {
        for index in 0..event.spawn_count {
            let Some(id) = state.spawn_unit(catalog, kind, HOSTILE_FACTION, pos) else {
                break;
            };
            let loot = usize::try_from(index)
                .ok()
                .filter(|_| !event.loot.is_empty())
                .map(|i| &event.loot[i % event.loot.len()]);
            if let (Some(item), Some(unit)) = (loot, state.unit_at_mut(pos, id)) {
                unit.take_item(catalog, item);
            }
        }
    }

    tracing::debug!(event = %event.id, x = pos.x, y = pos.y, "World event placed");
    state.log(EventCategory::World, event.description.clone(), Some(pos));
    ctx.notify(Notification::WorldEvent {
        id: event.id.clone(),
        pos,
    });
    Some(pos)
}

/// Clear markers whose time is up.
pub fn expire_world_events(state: &mut GameState) {
    let tick = state.tick;
    for tile in state.grid.tiles_mut() {
        if tile
            .world_event
            .as_ref()
            .is_some_and(|marker| marker.expires_at <= tick)
        {
            tile.world_event = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SimRng;
    use crate::test_fixtures::{catalog, two_faction_world};

    #[test]
    fn test_hostiles_land_on_wild_tiles() {
        let catalog = catalog();
        let mut state = two_faction_world(&catalog);
        let mut rng = SimRng::seed_from_u64(11);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let mut spawned = 0;
        for _ in 0..20 {
            if let Some(pos) = spawn_hostile(&mut state, &mut ctx) {
                let tile = state.tile(pos).unwrap();
                assert!(tile.owner.is_none());
                spawned += 1;
            }
        }
        assert!(spawned > 0);
        assert_eq!(state.unit_count(HOSTILE_FACTION), spawned);
    }

    #[test]
    fn test_hostile_cap() {
        let catalog = catalog();
        let mut state = two_faction_world(&catalog);
        for i in 0..MAX_HOSTILES {
            let x = u32::try_from(i % 8).unwrap();
            let y = u32::try_from(i / 8).unwrap();
            state.spawn_unit(&catalog, "wolf", HOSTILE_FACTION, TilePos::new(x, y));
        }
        let mut rng = SimRng::seed_from_u64(11);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        assert_eq!(spawn_hostile(&mut state, &mut ctx), None);
    }

    #[test]
    fn test_world_event_spawns_guardians_and_expires() {
        let catalog = catalog();
        let base = two_faction_world(&catalog);
        let placed = (0..32).find_map(|seed| {
            let mut state = base.clone();
            let mut rng = SimRng::seed_from_u64(seed);
            let mut ctx = TickContext::new(&catalog, &mut rng);
            place_world_event(&mut state, &mut ctx).map(|pos| (state, pos))
        });
        let (mut state, pos) = placed.unwrap();

        let guardians = state.units_at(pos);
        assert_eq!(guardians.len(), 2);
        assert!(guardians
            .iter()
            .all(|u| u.owner == HOSTILE_FACTION && u.equipment.values().any(|i| i == "fang")));
        let marker = state.tile(pos).unwrap().world_event.clone().unwrap();
        assert_eq!(marker.id, "den");

        state.tick = marker.expires_at - 1;
        expire_world_events(&mut state);
        assert!(state.tile(pos).unwrap().world_event.is_some());
        state.tick = marker.expires_at;
        expire_world_events(&mut state);
        assert!(state.tile(pos).unwrap().world_event.is_none());
    }
}
