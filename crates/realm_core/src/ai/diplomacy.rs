//! Opinion drift, war, peace and alliances.
//!
//! Each faction updates its own view of every relation at its cadence.
//! Status changes always go through [`GameState::set_status`], which
//! writes both directions at once.

use crate::data::{Personality, MAX_PERSONALITY};
use crate::events::{EventCategory, Notification};
use crate::factions::{DiplomacyStatus, FactionId, Relation, MIN_OPINION};
use crate::math::{ratio, Fixed};
use crate::simulation::TickContext;
use crate::state::GameState;

/// Opinion lost per invocation from border friction.
pub const FRICTION: i32 = 1;
/// Opinion gained per invocation when both sides fight a common enemy.
pub const COMMON_ENEMY_BONUS: i32 = 3;
/// Opinion regained per invocation while at war.
pub const WAR_RECOVERY: i32 = 2;
/// Opinion at which a war may end.
pub const PEACE_THRESHOLD: i32 = -40;
/// Percent chance of peace once the threshold is cleared.
pub const PEACE_CHANCE_PERCENT: u32 = 5;
/// Alliance threshold before the diplomacy discount.
pub const ALLIANCE_BASE_THRESHOLD: i32 = 80;
/// Threshold discount per point of diplomacy.
pub const ALLIANCE_PER_DIPLOMACY: i32 = 5;
/// Percent chance of an alliance once both sides qualify.
pub const ALLIANCE_CHANCE_PERCENT: u32 = 5;
/// War chance is `aggression / WAR_CHANCE_DIVISOR`.
pub const WAR_CHANCE_DIVISOR: u32 = 500;

fn trait_points(value: u32) -> i32 {
    i32::try_from(value.min(MAX_PERSONALITY)).unwrap_or(0)
}

/// Opinion a Neutral relation must fall below before war is possible.
#[must_use]
pub fn war_threshold(aggression: u32) -> i32 {
    MIN_OPINION + trait_points(aggression) * 6
}

/// Opinion each side must exceed before an alliance is possible.
#[must_use]
pub fn alliance_threshold(diplomacy: u32) -> i32 {
    ALLIANCE_BASE_THRESHOLD - trait_points(diplomacy) * ALLIANCE_PER_DIPLOMACY
}

/// Per-invocation probability that `relation` turns into war.
///
/// `None` unless the relation is Neutral and opinion is below
/// [`war_threshold`].
#[must_use]
pub fn war_declaration_chance(relation: &Relation, aggression: u32) -> Option<Fixed> {
    (relation.status == DiplomacyStatus::Neutral && relation.opinion < war_threshold(aggression))
        .then(|| ratio(aggression.min(MAX_PERSONALITY), WAR_CHANCE_DIVISOR))
}

fn personality(ctx: &TickContext<'_>, faction: &str) -> Personality {
    ctx.catalog
        .get_faction(faction)
        .map(|data| data.personality)
        .unwrap_or_default()
}

fn shares_enemy(state: &GameState, a: &str, b: &str) -> bool {
    let (Some(fa), Some(fb)) = (state.factions.get(a), state.factions.get(b)) else {
        return false;
    };
    fa.diplomacy.iter().any(|(third, relation)| {
        third != b
            && relation.status == DiplomacyStatus::War
            && fb.status_toward(third) == DiplomacyStatus::War
    })
}

fn opinion(state: &GameState, from: &str, to: &str) -> Option<i32> {
    state
        .factions
        .get(from)?
        .diplomacy
        .get(to)
        .map(|relation| relation.opinion)
}

/// Update every relation `faction` holds.
pub fn run(state: &mut GameState, ctx: &mut TickContext<'_>, faction: &str) {
    let Some(entry) = state.factions.get(faction) else {
        return;
    };
    let others: Vec<FactionId> = entry.diplomacy.keys().cloned().collect();
    let own = personality(ctx, faction);

    for other in others {
        if !state.factions.contains_key(&other) {
            continue;
        }
        let common_enemy = shares_enemy(state, faction, &other);
        let Some(relation) = state
            .factions
            .get_mut(faction)
            .and_then(|entry| entry.diplomacy.get_mut(&other))
        else {
            continue;
        };
        match relation.status {
            DiplomacyStatus::War => relation.adjust_opinion(WAR_RECOVERY),
            DiplomacyStatus::Neutral | DiplomacyStatus::Alliance => {
                let bonus = if common_enemy { COMMON_ENEMY_BONUS } else { 0 };
                relation.adjust_opinion(bonus - FRICTION);
            }
        }
        let relation = *relation;

        match relation.status {
            DiplomacyStatus::Neutral => {
                if let Some(chance) = war_declaration_chance(&relation, own.aggression) {
                    if ctx.rng.chance(chance) {
                        declare_war(state, ctx, faction, &other);
                        continue;
                    }
                }
                let theirs = personality(ctx, &other);
                let mirrored = opinion(state, &other, faction).unwrap_or(0);
                if relation.opinion > alliance_threshold(own.diplomacy)
                    && mirrored > alliance_threshold(theirs.diplomacy)
                    && ctx.rng.percent(ALLIANCE_CHANCE_PERCENT)
                {
                    form_alliance(state, ctx, faction, &other);
                }
            }
            DiplomacyStatus::War => {
                if relation.opinion >= PEACE_THRESHOLD && ctx.rng.percent(PEACE_CHANCE_PERCENT) {
                    normalize(state, ctx, faction, &other, "made peace with");
                }
            }
            DiplomacyStatus::Alliance => {
                let mirrored = opinion(state, &other, faction).unwrap_or(0);
                if relation.opinion < 0 || mirrored < 0 {
                    normalize(state, ctx, faction, &other, "broke their alliance with");
                }
            }
        }
    }
}

/// Flip a pair to war with both opinions pinned to the minimum.
pub(crate) fn declare_war(state: &mut GameState, ctx: &mut TickContext<'_>, aggressor: &str, target: &str) {
    state.set_status(aggressor, target, DiplomacyStatus::War);
    for (from, to) in [(aggressor, target), (target, aggressor)] {
        if let Some(relation) = state
            .factions
            .get_mut(from)
            .and_then(|entry| entry.diplomacy.get_mut(to))
        {
            relation.opinion = MIN_OPINION;
        }
    }
    tracing::debug!(aggressor, target, "War declared");
    state.log(
        EventCategory::Diplomacy,
        format!("{aggressor} declared war on {target}"),
        None,
    );
    ctx.notify(Notification::WarDeclared {
        aggressor: aggressor.to_string(),
        target: target.to_string(),
    });
}

fn form_alliance(state: &mut GameState, ctx: &mut TickContext<'_>, a: &str, b: &str) {
    state.set_status(a, b, DiplomacyStatus::Alliance);
    tracing::debug!(a, b, "Alliance formed");
    state.log(
        EventCategory::Diplomacy,
        format!("{a} and {b} formed an alliance"),
        None,
    );
    ctx.notify(Notification::AllianceFormed {
        a: a.to_string(),
        b: b.to_string(),
    });
}

fn normalize(state: &mut GameState, ctx: &mut TickContext<'_>, a: &str, b: &str, verb: &str) {
    state.set_status(a, b, DiplomacyStatus::Neutral);
    tracing::debug!(a, b, "Relations normalized");
    state.log(EventCategory::Diplomacy, format!("{a} {verb} {b}"), None);
    ctx.notify(Notification::RelationsNormalized {
        a: a.to_string(),
        b: b.to_string(),
    });
}
