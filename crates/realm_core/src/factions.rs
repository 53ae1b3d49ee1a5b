//! Per-faction mutable state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::UnitId;
use crate::data::{Catalog, ResourceTier};
use crate::error::{GameError, Result};
use crate::math::{fixed_map_serde, fixed_serde, Fixed};

/// Faction identifier (catalog id).
pub type FactionId = String;

/// Owner id of wild units. Never present in the faction map and hostile
/// to everyone.
pub const HOSTILE_FACTION: &str = "hostile";

/// Lowest possible opinion.
pub const MIN_OPINION: i32 = -100;
/// Highest possible opinion.
pub const MAX_OPINION: i32 = 100;

/// Stance between two factions. Always identical in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DiplomacyStatus {
    /// Units fight on contact.
    War,
    /// Default stance.
    #[default]
    Neutral,
    /// Allied.
    Alliance,
}

/// One side's view of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Relation {
    /// Shared stance.
    pub status: DiplomacyStatus,
    /// This side's opinion of the other, in `[-100, 100]`.
    pub opinion: i32,
}

impl Relation {
    /// Shift opinion, clamped to the valid range.
    pub fn adjust_opinion(&mut self, delta: i32) {
        self.opinion = (self.opinion + delta).clamp(MIN_OPINION, MAX_OPINION);
    }
}

/// Whether the faction leader is home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LeaderStatus {
    /// At the settlement, may begin an adventure.
    #[default]
    Settled,
    /// Away with the given hero unit.
    Adventuring {
        /// Hero unit on the map.
        hero: UnitId,
    },
}

/// Resource stockpile with per-tier capacity.
///
/// Every stock stays in `[0, capacity(tier)]`.
#[derive(Debug, Clone, Default, PartialEq, Hash, Eq, Serialize, Deserialize)]
pub struct Storage {
    #[serde(with = "fixed_map_serde")]
    stocks: BTreeMap<String, Fixed>,
    #[serde(with = "fixed_map_serde")]
    capacity: BTreeMap<ResourceTier, Fixed>,
}

impl Storage {
    /// Storage seeded with the catalog's base capacity.
    #[must_use]
    pub fn with_base_capacity(catalog: &Catalog) -> Self {
        let capacity = ResourceTier::ALL
            .iter()
            .map(|tier| (*tier, Fixed::from_num(catalog.base_storage(*tier))))
            .collect();
        Self {
            stocks: BTreeMap::new(),
            capacity,
        }
    }

    /// Current amount of a resource.
    #[must_use]
    pub fn amount(&self, resource: &str) -> Fixed {
        self.stocks.get(resource).copied().unwrap_or(Fixed::ZERO)
    }

    /// Capacity of a tier.
    #[must_use]
    pub fn capacity(&self, tier: ResourceTier) -> Fixed {
        self.capacity.get(&tier).copied().unwrap_or(Fixed::ZERO)
    }

    /// Free space for a resource in the given tier.
    #[must_use]
    pub fn headroom(&self, resource: &str, tier: ResourceTier) -> Fixed {
        (self.capacity(tier) - self.amount(resource)).max(Fixed::ZERO)
    }

    /// All stocks in id order.
    pub fn stocks(&self) -> impl Iterator<Item = (&str, Fixed)> {
        self.stocks.iter().map(|(id, amount)| (id.as_str(), *amount))
    }

    /// Add up to `amount`, respecting capacity.
    ///
    /// Returns the amount actually stored.
    pub fn deposit(&mut self, resource: &str, tier: ResourceTier, amount: Fixed) -> Fixed {
        let stored = amount.min(self.headroom(resource, tier)).max(Fixed::ZERO);
        if stored > Fixed::ZERO {
            *self.stocks.entry(resource.to_string()).or_insert(Fixed::ZERO) += stored;
        }
        stored
    }

    /// Overwrite a stock, clamped to `[0, capacity(tier)]`.
    pub(crate) fn set_amount(&mut self, resource: &str, tier: ResourceTier, amount: Fixed) {
        let amount = amount.clamp(Fixed::ZERO, self.capacity(tier));
        self.stocks.insert(resource.to_string(), amount);
    }

    /// Whether every entry of `cost` is covered.
    #[must_use]
    pub fn can_afford(&self, cost: &BTreeMap<String, Fixed>) -> bool {
        cost.iter()
            .all(|(resource, required)| self.amount(resource) >= *required)
    }

    /// Deduct `cost` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientResources`] for the first short
    /// resource; nothing is deducted in that case.
    pub fn spend(&mut self, cost: &BTreeMap<String, Fixed>) -> Result<()> {
        for (resource, required) in cost {
            let available = self.amount(resource);
            if available < *required {
                return Err(GameError::InsufficientResources {
                    resource: resource.clone(),
                    required: *required,
                    available,
                });
            }
        }
        for (resource, required) in cost {
            if let Some(stock) = self.stocks.get_mut(resource) {
                *stock = (*stock - *required).max(Fixed::ZERO);
            }
        }
        Ok(())
    }

    /// Replace tier capacities, clamping any stock that no longer fits.
    pub fn set_capacity(&mut self, capacity: BTreeMap<ResourceTier, Fixed>, catalog: &Catalog) {
        self.capacity = capacity;
        let limits = &self.capacity;
        for (resource, stock) in &mut self.stocks {
            let Some(tier) = catalog.resource_tier(resource) else {
                continue;
            };
            let limit = limits.get(&tier).copied().unwrap_or(Fixed::ZERO);
            if *stock > limit {
                *stock = limit;
            }
        }
    }
}

/// Mutable state of one faction.
#[derive(Debug, Clone, PartialEq, Hash, Eq, Serialize, Deserialize)]
pub struct FactionState {
    /// Catalog id.
    pub id: FactionId,
    /// Stockpile.
    pub storage: Storage,
    /// Hero unit type of the leader.
    pub leader: String,
    /// Whether the leader is home.
    pub leader_status: LeaderStatus,
    /// Unspent research points.
    pub research: u64,
    /// Unlocked tech ids.
    pub techs: BTreeSet<String>,
    /// Soft currency.
    #[serde(with = "fixed_serde")]
    pub athar: Fixed,
    /// Current population, never above settlement capacity.
    pub population: u32,
    /// Relations keyed by the other faction.
    pub diplomacy: BTreeMap<FactionId, Relation>,
    /// Lore items brought home by the leader.
    pub relics: Vec<String>,
}

impl FactionState {
    /// Fresh state with base storage and no population.
    #[must_use]
    pub fn new(id: impl Into<FactionId>, leader: impl Into<String>, catalog: &Catalog) -> Self {
        Self {
            id: id.into(),
            storage: Storage::with_base_capacity(catalog),
            leader: leader.into(),
            leader_status: LeaderStatus::Settled,
            research: 0,
            techs: BTreeSet::new(),
            athar: Fixed::ZERO,
            population: 0,
            diplomacy: BTreeMap::new(),
            relics: Vec::new(),
        }
    }

    /// Stance toward `other`; unknown pairs are neutral.
    #[must_use]
    pub fn status_toward(&self, other: &str) -> DiplomacyStatus {
        self.diplomacy
            .get(other)
            .map_or(DiplomacyStatus::Neutral, |r| r.status)
    }

    /// Whether this faction is at war with anyone.
    #[must_use]
    pub fn at_war(&self) -> bool {
        self.diplomacy
            .values()
            .any(|r| r.status == DiplomacyStatus::War)
    }
}

/// Whether units of `a` and `b` fight on contact.
///
/// True for an explicit war, or when exactly one side is the hostile
/// faction.
#[must_use]
pub fn are_hostile(
    factions: &BTreeMap<FactionId, FactionState>,
    a: &str,
    b: &str,
) -> bool {
    if a == b {
        return false;
    }
    if a == HOSTILE_FACTION || b == HOSTILE_FACTION {
        return true;
    }
    factions
        .get(a)
        .is_some_and(|f| f.status_toward(b) == DiplomacyStatus::War)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_ron_str(
            r#"(
                resources: [
                    ResourceData(id: "wood", name: "Wood", tier: Raw),
                    ResourceData(id: "gold", name: "Gold", tier: Exotic),
                ],
                base_storage: {Raw: 100, Exotic: 10},
            )"#,
        )
        .unwrap()
    }

    fn cost(entries: &[(&str, i32)]) -> BTreeMap<String, Fixed> {
        entries
            .iter()
            .map(|(id, n)| ((*id).to_string(), Fixed::from_num(*n)))
            .collect()
    }

    #[test]
    fn test_deposit_clamps_to_capacity() {
        let catalog = catalog();
        let mut storage = Storage::with_base_capacity(&catalog);
        let stored = storage.deposit("wood", ResourceTier::Raw, Fixed::from_num(150));
        assert_eq!(stored, Fixed::from_num(100));
        assert_eq!(storage.amount("wood"), Fixed::from_num(100));
        let stored = storage.deposit("wood", ResourceTier::Raw, Fixed::from_num(5));
        assert_eq!(stored, Fixed::ZERO);
    }

    #[test]
    fn test_spend_is_atomic() {
        let catalog = catalog();
        let mut storage = Storage::with_base_capacity(&catalog);
        storage.deposit("wood", ResourceTier::Raw, Fixed::from_num(50));
        storage.deposit("gold", ResourceTier::Exotic, Fixed::from_num(2));

        let err = storage
            .spend(&cost(&[("wood", 10), ("gold", 5)]))
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientResources { .. }));
        assert_eq!(storage.amount("wood"), Fixed::from_num(50));

        storage.spend(&cost(&[("wood", 10), ("gold", 2)])).unwrap();
        assert_eq!(storage.amount("wood"), Fixed::from_num(40));
        assert_eq!(storage.amount("gold"), Fixed::ZERO);
    }

    #[test]
    fn test_shrinking_capacity_clamps_stock() {
        let catalog = catalog();
        let mut storage = Storage::with_base_capacity(&catalog);
        storage.deposit("wood", ResourceTier::Raw, Fixed::from_num(80));
        let mut capacity = BTreeMap::new();
        capacity.insert(ResourceTier::Raw, Fixed::from_num(30));
        storage.set_capacity(capacity, &catalog);
        assert_eq!(storage.amount("wood"), Fixed::from_num(30));
    }

    #[test]
    fn test_hostile_faction_fights_everyone() {
        let catalog = catalog();
        let mut factions = BTreeMap::new();
        factions.insert("a".to_string(), FactionState::new("a", "hero", &catalog));
        assert!(are_hostile(&factions, "a", HOSTILE_FACTION));
        assert!(are_hostile(&factions, HOSTILE_FACTION, "a"));
        assert!(!are_hostile(&factions, "a", "a"));
        assert!(!are_hostile(&factions, "a", "b"));
    }

    proptest! {
        #[test]
        fn prop_stock_never_exceeds_capacity(deposits in proptest::collection::vec(0i32..80, 1..20)) {
            let catalog = catalog();
            let mut storage = Storage::with_base_capacity(&catalog);
            for amount in deposits {
                storage.deposit("wood", ResourceTier::Raw, Fixed::from_num(amount));
                prop_assert!(storage.amount("wood") <= storage.capacity(ResourceTier::Raw));
            }
        }
    }
}
