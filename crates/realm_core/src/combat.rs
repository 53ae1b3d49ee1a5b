//! Pairwise combat with terrain and trait modifiers.
//!
//! An exchange computes both blows before applying either:
//!
//! ```text
//! attack    = base × (1 + faction stat% + level growth + attacker terrain%) + gear
//! bonus     = Σ bonus-vs-tag% (defender carries the tag) + Σ rolled critical%
//! reduction = Σ damage-reduction% + defender terrain defense%   (capped at 75%)
//! damage    = max(floor(attack × (1 + bonus) × (1 − reduction)), 1)
//! ```
//!
//! A successful first-strike roll skips the counter blow when the first
//! blow is lethal. Defenders that cannot fight never strike back.

use crate::components::{UnitId, UnitInstance};
use crate::data::{BiomeData, Catalog, CombatTrait, UnitData, UnitStat};
use crate::events::{EventCategory, Notification};
use crate::grid::TilePos;
use crate::math::{apply_percent, floor_u32, Fixed};
use crate::rng::SimRng;
use crate::simulation::TickContext;
use crate::state::{AttackFlash, DyingUnit, GameState};

/// Minimum damage any blow deals.
pub const MIN_DAMAGE: u32 = 1;

/// Maximum reduction (percent) traits and terrain can reach together.
pub const MAX_REDUCTION_PERCENT: i32 = 75;

/// Experience per victim tier for a kill.
pub const KILL_EXPERIENCE_PER_TIER: u32 = 10;

/// One side of an exchange.
#[derive(Debug, Clone, Copy)]
pub struct Fighter<'a> {
    /// The unit.
    pub unit: &'a UnitInstance,
    /// Its definition.
    pub def: &'a UnitData,
    /// Owner's attack modifier in percent.
    pub stat_modifier: i32,
    /// Biome of the tile the unit stands on.
    pub terrain: Option<&'a BiomeData>,
}

/// Final damage for one blow.
#[must_use]
pub fn damage_dealt(attack: Fixed, bonus_percent: i32, reduction_percent: i32) -> u32 {
    let raw = apply_percent(attack, bonus_percent);
    let reduction = reduction_percent.clamp(0, MAX_REDUCTION_PERCENT);
    floor_u32(apply_percent(raw, -reduction)).max(MIN_DAMAGE)
}

/// Roll and compute one blow from `attacker` to `defender`.
pub fn strike(catalog: &Catalog, attacker: &Fighter<'_>, defender: &Fighter<'_>, rng: &mut SimRng) -> u32 {
    let terrain_attack = attacker.terrain.map_or(0, |biome| biome.attack_bonus);
    let attack = attacker.unit.attack_power(
        attacker.def,
        catalog,
        attacker.stat_modifier.saturating_add(terrain_attack),
    );

    let mut bonus = 0i32;
    for combat_trait in &attacker.def.traits {
        match combat_trait {
            CombatTrait::BonusVsTag { tag, percent } if defender.def.has_tag(tag) => {
                bonus = bonus.saturating_add(*percent);
            }
            CombatTrait::CriticalChance { chance, percent } => {
                if rng.percent(*chance) {
                    bonus = bonus.saturating_add(*percent);
                }
            }
            _ => {}
        }
    }

    let reduction: i32 = defender
        .def
        .traits
        .iter()
        .filter_map(|combat_trait| match combat_trait {
            CombatTrait::DamageReduction { percent } => Some(*percent),
            _ => None,
        })
        .sum::<i32>()
        .saturating_add(defender.terrain.map_or(0, |biome| biome.defense_bonus));

    damage_dealt(attack, bonus, reduction)
}

fn terrain_at<'c>(state: &GameState, catalog: &'c Catalog, pos: TilePos) -> Option<&'c BiomeData> {
    state.tile(pos).and_then(|tile| catalog.get_biome(&tile.biome))
}

/// Result of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Damage the attacker dealt.
    pub dealt: u32,
    /// Counter damage the attacker took, if the defender struck back.
    pub received: Option<u32>,
    /// Whether the attacker died.
    pub attacker_died: bool,
    /// Whether the defender died.
    pub defender_died: bool,
}

/// Resolve an exchange between two live units.
///
/// Returns `None` if either unit or its definition is missing.
pub fn engage(
    state: &mut GameState,
    ctx: &mut TickContext<'_>,
    attacker: UnitId,
    defender: UnitId,
) -> Option<Exchange> {
    let catalog = ctx.catalog;
    let a = state.unit(attacker)?.clone();
    let d = state.unit(defender)?.clone();
    let (Some(a_def), Some(d_def)) = (catalog.get_unit(&a.kind), catalog.get_unit(&d.kind)) else {
        tracing::warn!(attacker = %a.kind, defender = %d.kind, "Skipping combat with unknown unit type");
        return None;
    };
    let a_side = Fighter {
        unit: &a,
        def: a_def,
        stat_modifier: state.stat_modifier(catalog, &a.owner, a_def.role, UnitStat::Attack),
        terrain: terrain_at(state, catalog, a.pos),
    };
    let d_side = Fighter {
        unit: &d,
        def: d_def,
        stat_modifier: state.stat_modifier(catalog, &d.owner, d_def.role, UnitStat::Attack),
        terrain: terrain_at(state, catalog, d.pos),
    };

    let dealt = strike(catalog, &a_side, &d_side, ctx.rng);
    let counter = d_def
        .can_fight()
        .then(|| strike(catalog, &d_side, &a_side, ctx.rng));
    let first_strike = a_def.traits.iter().find_map(|combat_trait| match combat_trait {
        CombatTrait::FirstStrike { chance } => Some(*chance),
        _ => None,
    });
    let first_strike = first_strike.is_some_and(|chance| ctx.rng.percent(chance));

    let defender_died = d.hp <= dealt;
    let received = if first_strike && defender_died {
        None
    } else {
        counter
    };
    let attacker_died = received.is_some_and(|damage| a.hp <= damage);

    if let Some(unit) = state.unit_at_mut(d.pos, defender) {
        unit.hp = unit.hp.saturating_sub(dealt);
    }
    if let Some(damage) = received {
        if let Some(unit) = state.unit_at_mut(a.pos, attacker) {
            unit.hp = unit.hp.saturating_sub(damage);
        }
    }

    state.attack_flashes.push(AttackFlash {
        from: a.pos,
        to: d.pos,
        tick: state.tick,
    });
    ctx.notify(Notification::Attack {
        from: a.pos,
        to: d.pos,
    });
    tracing::debug!(attacker, defender, dealt, received = ?received, "Combat exchange");

    // in a mutual kill neither side lives to take the credit
    let survivor = |died: bool, id: UnitId| (!died).then_some(id);
    if defender_died {
        kill(state, ctx, defender, survivor(attacker_died, attacker));
    }
    if attacker_died {
        kill(state, ctx, attacker, survivor(defender_died, defender));
    }
    Some(Exchange {
        dealt,
        received,
        attacker_died,
        defender_died,
    })
}

/// Remove a dead unit, credit its killer and record it as dying.
pub(crate) fn kill(state: &mut GameState, ctx: &mut TickContext<'_>, victim: UnitId, killer: Option<UnitId>) {
    let catalog = ctx.catalog;
    let Some(mut dead) = state.take_unit(victim) else {
        return;
    };
    dead.hp = 0;
    let tier = catalog
        .get_unit(&dead.kind)
        .map_or(1, |def| u32::from(def.tier).max(1));

    if let Some(killer) = killer.filter(|id| state.unit(*id).is_some()) {
        if let Some(unit) = state.unit_mut(killer) {
            unit.kills += 1;
        }
        state.award_experience(catalog, killer, KILL_EXPERIENCE_PER_TIER * tier);
        let loot = dead.drain_items();
        if let Some(unit) = state.unit_mut(killer) {
            for item in &loot {
                unit.take_item(catalog, item);
            }
        }
    }
    crate::ai::leader::hero_fell(state, &dead.owner, dead.id);

    let name = catalog.get_unit(&dead.kind).map_or(dead.kind.as_str(), |def| def.name.as_str());
    state.log(
        EventCategory::Military,
        format!("A {name} of {} fell", dead.owner),
        Some(dead.pos),
    );
    ctx.notify(Notification::UnitDied {
        unit: dead.id,
        pos: dead.pos,
    });
    tracing::debug!(unit = dead.id, owner = %dead.owner, "Unit died");
    let death_tick = state.tick;
    state.dying.push(DyingUnit {
        unit: dead,
        death_tick,
    });
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::factions::DiplomacyStatus;
    use crate::test_fixtures::{catalog, two_faction_world};

    fn at_war(catalog: &Catalog) -> (GameState, UnitId, UnitId) {
        let mut state = two_faction_world(catalog);
        state.set_status("red", "blue", DiplomacyStatus::War);
        let a = state
            .spawn_unit(catalog, "soldier", "red", TilePos::new(4, 4))
            .unwrap();
        let b = state
            .spawn_unit(catalog, "soldier", "blue", TilePos::new(5, 4))
            .unwrap();
        (state, a, b)
    }

    #[test]
    fn test_both_sides_take_damage() {
        let catalog = catalog();
        let (mut state, a, b) = at_war(&catalog);
        let mut rng = SimRng::seed_from_u64(1);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let exchange = engage(&mut state, &mut ctx, a, b).unwrap();

        assert!(exchange.dealt >= MIN_DAMAGE);
        assert!(exchange.received.unwrap() >= MIN_DAMAGE);
        assert!(state.unit(a).unwrap().hp < 30);
        assert!(state.unit(b).unwrap().hp < 30);
        assert_eq!(state.attack_flashes().len(), 1);
        assert!(ctx.notifications.iter().any(|n| n.name() == "attack"));
    }

    #[test]
    fn test_kill_credits_and_records_dying() {
        let catalog = catalog();
        let (mut state, a, b) = at_war(&catalog);
        state.tick = 77;
        if let Some(unit) = state.unit_mut(b) {
            unit.hp = 1;
            unit.take_item(&catalog, "fang");
        }
        let mut rng = SimRng::seed_from_u64(1);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let exchange = engage(&mut state, &mut ctx, a, b).unwrap();

        assert!(exchange.defender_died);
        assert!(state.unit(b).is_none());
        assert!(state.units_at(TilePos::new(5, 4)).is_empty());
        let killer = state.unit(a).unwrap();
        assert_eq!(killer.kills, 1);
        assert_eq!(killer.xp, KILL_EXPERIENCE_PER_TIER);
        assert!(killer.equipment.values().any(|id| id == "fang"));

        let dying = state.dying();
        assert_eq!(dying.len(), 1);
        assert_eq!(dying[0].unit.id, b);
        assert_eq!(dying[0].death_tick, 77);
        assert_eq!(dying[0].unit.hp, 0);
    }

    #[test]
    fn test_mutual_kill_rewards_nobody() {
        let catalog = catalog();
        let (mut state, a, b) = at_war(&catalog);
        for id in [a, b] {
            if let Some(unit) = state.unit_mut(id) {
                unit.hp = 1;
            }
        }
        let mut rng = SimRng::seed_from_u64(1);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let exchange = engage(&mut state, &mut ctx, a, b).unwrap();

        assert!(exchange.attacker_died && exchange.defender_died);
        assert!(state.unit(a).is_none());
        assert!(state.unit(b).is_none());
        let dying = state.dying();
        assert_eq!(dying.len(), 2);
        for dead in dying {
            assert_eq!(dead.unit.kills, 0);
            assert_eq!(dead.unit.xp, 0);
            assert_eq!(dead.unit.hp, 0);
        }
    }

    #[test]
    fn test_defender_is_credited_when_attacker_falls() {
        let catalog = catalog();
        let (mut state, a, b) = at_war(&catalog);
        if let Some(unit) = state.unit_mut(a) {
            unit.hp = 1;
        }
        let mut rng = SimRng::seed_from_u64(1);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let exchange = engage(&mut state, &mut ctx, a, b).unwrap();

        assert!(exchange.attacker_died);
        assert!(!exchange.defender_died);
        let defender = state.unit(b).unwrap();
        assert_eq!(defender.kills, 1);
        assert_eq!(defender.xp, KILL_EXPERIENCE_PER_TIER);
    }

    #[test]
    fn test_first_strike_skips_counter_on_kill() {
        let catalog = catalog();
        let (mut state, _, b) = at_war(&catalog);
        let lancer = state
            .spawn_unit(&catalog, "lancer", "red", TilePos::new(4, 4))
            .unwrap();
        if let Some(unit) = state.unit_mut(b) {
            unit.hp = 1;
        }
        let mut rng = SimRng::seed_from_u64(1);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let exchange = engage(&mut state, &mut ctx, lancer, b).unwrap();
        // the lancer's first strike always triggers
        assert!(exchange.defender_died);
        assert_eq!(exchange.received, None);
        assert_eq!(state.unit(lancer).unwrap().hp, 25);
    }

    #[test]
    fn test_workers_do_not_strike_back() {
        let catalog = catalog();
        let (mut state, a, _) = at_war(&catalog);
        let worker = state
            .spawn_unit(&catalog, "worker", "blue", TilePos::new(5, 5))
            .unwrap();
        let mut rng = SimRng::seed_from_u64(1);
        let mut ctx = TickContext::new(&catalog, &mut rng);
        let exchange = engage(&mut state, &mut ctx, a, worker).unwrap();
        assert_eq!(exchange.received, None);
    }

    #[test]
    fn test_terrain_and_reduction() {
        assert_eq!(damage_dealt(Fixed::from_num(10), 0, 0), 10);
        assert_eq!(damage_dealt(Fixed::from_num(10), 50, 0), 15);
        assert_eq!(damage_dealt(Fixed::from_num(10), 0, 20), 8);
        // reduction caps at 75%
        assert_eq!(damage_dealt(Fixed::from_num(10), 0, 200), 2);
        assert_eq!(damage_dealt(Fixed::ZERO, 0, 0), MIN_DAMAGE);
    }

    proptest! {
        #[test]
        fn prop_damage_floor(attack in 0u32..500, bonus in -300i32..300, reduction in -100i32..300) {
            prop_assert!(damage_dealt(Fixed::from_num(attack), bonus, reduction) >= MIN_DAMAGE);
        }
    }
}
