//! Additive trait-effect aggregation.
//!
//! Every percentage bonus in the simulation goes through [`aggregate`]:
//! production yields, construction and training costs, unit stats and
//! population growth. A faction's effect pool is its catalog traits plus
//! the effects of every tech it has unlocked.
//!
//! An effect contributes to a query when its kind matches and each of its
//! discriminators (tier, role, stat) is either unset or equal to the
//! queried value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{Catalog, ResourceTier, UnitRole, UnitStat};
use crate::factions::FactionState;
use crate::math::{apply_percent, Fixed};

/// A single additive modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraitEffect {
    /// Production yield bonus, optionally for one tier only.
    Production {
        /// Tier filter; `None` applies to all tiers.
        #[serde(default)]
        tier: Option<ResourceTier>,
        /// Bonus percent.
        percent: i32,
    },
    /// Cost change for construction, upgrades and training.
    Cost {
        /// Percent; negative values are discounts.
        percent: i32,
    },
    /// Unit stat bonus.
    UnitStat {
        /// Role filter; `None` applies to every role.
        #[serde(default)]
        role: Option<UnitRole>,
        /// Stat filter; `None` applies to every stat.
        #[serde(default)]
        stat: Option<UnitStat>,
        /// Bonus percent.
        percent: i32,
    },
    /// Population growth bonus.
    PopulationGrowth {
        /// Bonus percent.
        percent: i32,
    },
}

/// What a caller wants the modifier for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierQuery {
    /// Production of a resource in this tier.
    Production(ResourceTier),
    /// Any cost.
    Cost,
    /// A stat of a unit with this role.
    UnitStat(UnitRole, UnitStat),
    /// Population growth.
    PopulationGrowth,
}

impl TraitEffect {
    /// Percent this effect adds to `query`, if it applies.
    #[must_use]
    pub fn contribution(&self, query: ModifierQuery) -> Option<i32> {
        match (self, query) {
            (Self::Production { tier, percent }, ModifierQuery::Production(wanted))
                if matches_filter(*tier, wanted) =>
            {
                Some(*percent)
            }
            (Self::Cost { percent }, ModifierQuery::Cost) => Some(*percent),
            (
                Self::UnitStat { role, stat, percent },
                ModifierQuery::UnitStat(wanted_role, wanted_stat),
            ) if matches_filter(*role, wanted_role) && matches_filter(*stat, wanted_stat) => {
                Some(*percent)
            }
            (Self::PopulationGrowth { percent }, ModifierQuery::PopulationGrowth) => {
                Some(*percent)
            }
            _ => None,
        }
    }
}

fn matches_filter<T: PartialEq>(discriminator: Option<T>, wanted: T) -> bool {
    discriminator.map_or(true, |d| d == wanted)
}

/// Sum every matching effect, in percentage points.
pub fn aggregate<'a>(
    effects: impl IntoIterator<Item = &'a TraitEffect>,
    query: ModifierQuery,
) -> i32 {
    effects
        .into_iter()
        .filter_map(|effect| effect.contribution(query))
        .sum()
}

/// Iterate the faction's catalog traits and unlocked tech effects.
///
/// Unknown faction or tech ids contribute nothing.
pub fn faction_effects<'a>(
    catalog: &'a Catalog,
    faction: &'a FactionState,
) -> impl Iterator<Item = &'a TraitEffect> {
    let traits = catalog
        .get_faction(&faction.id)
        .into_iter()
        .flat_map(|data| data.traits.iter());
    let techs = faction
        .techs
        .iter()
        .filter_map(|id| catalog.get_tech(id))
        .flat_map(|tech| tech.effects.iter());
    traits.chain(techs)
}

/// The modifier for `query` on `faction`, in percentage points.
#[must_use]
pub fn faction_modifier(catalog: &Catalog, faction: &FactionState, query: ModifierQuery) -> i32 {
    aggregate(faction_effects(catalog, faction), query)
}

/// Apply the faction's cost modifier to a catalog cost table.
#[must_use]
pub fn modified_cost(
    catalog: &Catalog,
    faction: &FactionState,
    base: &BTreeMap<String, u32>,
) -> BTreeMap<String, Fixed> {
    let bonus = faction_modifier(catalog, faction, ModifierQuery::Cost);
    base.iter()
        .map(|(resource, amount)| (resource.clone(), apply_percent(Fixed::from_num(*amount), bonus)))
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn production(tier: Option<ResourceTier>, pct: i32) -> TraitEffect {
        TraitEffect::Production { tier, percent: pct }
    }

    #[test]
    fn test_unset_discriminator_matches_everything() {
        let effects = [production(None, 10), production(Some(ResourceTier::Raw), 5)];
        assert_eq!(
            aggregate(&effects, ModifierQuery::Production(ResourceTier::Raw)),
            15
        );
        assert_eq!(
            aggregate(&effects, ModifierQuery::Production(ResourceTier::Exotic)),
            10
        );
    }

    #[test]
    fn test_kinds_do_not_cross() {
        let effects = [
            TraitEffect::Cost { percent: -20 },
            TraitEffect::PopulationGrowth { percent: 50 },
        ];
        assert_eq!(aggregate(&effects, ModifierQuery::Cost), -20);
        assert_eq!(
            aggregate(&effects, ModifierQuery::PopulationGrowth),
            50
        );
        assert_eq!(
            aggregate(&effects, ModifierQuery::Production(ResourceTier::Raw)),
            0
        );
    }

    #[test]
    fn test_unit_stat_filters_by_role_and_stat() {
        let effects = [
            TraitEffect::UnitStat {
                role: Some(UnitRole::Soldier),
                stat: Some(UnitStat::Attack),
                percent: 20,
            },
            TraitEffect::UnitStat {
                role: None,
                stat: Some(UnitStat::Hp),
                percent: 10,
            },
        ];
        let soldier_attack = ModifierQuery::UnitStat(UnitRole::Soldier, UnitStat::Attack);
        let worker_attack = ModifierQuery::UnitStat(UnitRole::Worker, UnitStat::Attack);
        let worker_hp = ModifierQuery::UnitStat(UnitRole::Worker, UnitStat::Hp);
        assert_eq!(aggregate(&effects, soldier_attack), 20);
        assert_eq!(aggregate(&effects, worker_attack), 0);
        assert_eq!(aggregate(&effects, worker_hp), 10);
    }

    proptest! {
        #[test]
        fn prop_aggregate_is_sum_of_matching(pcts in proptest::collection::vec(-50i32..50, 0..12)) {
            let effects: Vec<_> = pcts.iter().map(|p| production(None, *p)).collect();
            let expected: i32 = pcts.iter().sum();
            prop_assert_eq!(
                aggregate(&effects, ModifierQuery::Production(ResourceTier::Component)),
                expected
            );
        }
    }
}
