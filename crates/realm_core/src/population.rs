//! Population growth, research accrual, tech unlocks and Athar.

use crate::data::Catalog;
use crate::events::{EventCategory, Notification};
use crate::math::Fixed;
use crate::modifiers::{faction_modifier, ModifierQuery};
use crate::simulation::{TickContext, POPULATION_PERIOD};
use crate::state::GameState;

/// Next population value.
///
/// `min(floor(pop × (1 + 0.01 × (1 + bonus))) + 1, capacity)` with the
/// bonus given in percent.
#[must_use]
pub fn next_population(population: u32, capacity: u32, growth_bonus: i32) -> u32 {
    // rate in hundredths of a percent
    let rate = u64::try_from(100 + i64::from(growth_bonus)).unwrap_or(0);
    let growth = u64::from(population) * rate / 10_000;
    let next = u64::from(population) + growth + 1;
    u32::try_from(next).unwrap_or(u32::MAX).min(capacity)
}

/// Grow one faction's population toward its settlement capacity.
pub fn grow(state: &mut GameState, catalog: &Catalog, faction: &str) {
    let capacity = state.settlement_capacity(catalog, faction);
    let Some(entry) = state.factions.get(faction) else {
        return;
    };
    let bonus = faction_modifier(catalog, entry, ModifierQuery::PopulationGrowth);
    let next = next_population(entry.population, capacity, bonus);
    if let Some(entry) = state.factions.get_mut(faction) {
        entry.population = next;
    }
}

/// Add research from owned structures, scaled by the population cadence.
pub fn accrue_research(state: &mut GameState, catalog: &Catalog, faction: &str) {
    let points: u64 = state
        .grid
        .tiles()
        .filter(|tile| tile.is_owned_by(faction))
        .filter_map(|tile| tile.infrastructure.as_deref())
        .filter_map(|id| catalog.get_infrastructure(id))
        .map(|infra| u64::from(infra.research_points) * POPULATION_PERIOD)
        .sum();
    if let Some(entry) = state.factions.get_mut(faction) {
        entry.research = entry.research.saturating_add(points);
    }
}

/// Unlock the cheapest affordable tech, ties broken by id.
///
/// Returns the unlocked tech id.
pub fn unlock_tech(state: &mut GameState, ctx: &mut TickContext<'_>, faction: &str) -> Option<String> {
    let entry = state.factions.get(faction)?;
    let tech = ctx
        .catalog
        .techs
        .iter()
        .filter(|tech| !entry.techs.contains(&tech.id) && tech.cost <= entry.research)
        .min_by(|a, b| a.cost.cmp(&b.cost).then_with(|| a.id.cmp(&b.id)))?;

    let entry = state.factions.get_mut(faction)?;
    entry.research -= tech.cost;
    entry.techs.insert(tech.id.clone());

    tracing::debug!(faction, tech = %tech.id, "Tech unlocked");
    state.log(
        EventCategory::Economy,
        format!("{faction} discovered {}", tech.name),
        None,
    );
    ctx.notify(Notification::TechUnlocked {
        faction: faction.to_string(),
        tech: tech.id.clone(),
    });
    Some(tech.id.clone())
}

/// Per-tick Athar accrual: each faction gains `population / 100`.
pub fn accrue_athar(state: &mut GameState) {
    let hundred = Fixed::from_num(100);
    let mut total = Fixed::ZERO;
    for faction in state.factions.values_mut() {
        let gain = Fixed::from_num(faction.population) / hundred;
        faction.athar = faction.athar.saturating_add(gain);
        total = total.saturating_add(gain);
    }
    state.world_athar = state.world_athar.saturating_add(total);
}
