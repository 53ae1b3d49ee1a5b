//! Infrastructure data structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::world_data::ResourceTier;

/// Upgrade path for a settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpgradePath {
    /// Infrastructure id the settlement becomes.
    pub target: String,
    /// Resource cost before the faction cost modifier.
    pub cost: BTreeMap<String, u32>,
}

/// What an installed structure does each tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum InfraKind {
    /// Houses population; the anchor for training and adventures.
    Settlement {
        /// Population this structure supports.
        population_capacity: u32,
        /// Caps the tier of units trainable here.
        tier: u8,
        /// Next step of the upgrade chain.
        #[serde(default)]
        upgrade: Option<UpgradePath>,
    },
    /// Pulls a resource from a matching deposit under the tile.
    Extractor {
        /// Deposit resource id required under the tile.
        resource: String,
        /// Units produced per tick before modifiers.
        amount: u32,
    },
    /// Converts inputs into an output.
    Processor {
        /// Resources consumed per tick.
        inputs: BTreeMap<String, u32>,
        /// Resource produced.
        output: String,
        /// Units produced per tick before modifiers.
        amount: u32,
    },
    /// Passive structure (storage, research).
    Facility,
}

/// Data-driven infrastructure definition.
///
/// # Example RON
///
/// ```ron
/// InfrastructureData(
///     id: "lumber_camp",
///     name: "Lumber Camp",
///     kind: Extractor(resource: "wood", amount: 1),
///     cost: {"wood": 20},
///     storage: {Raw: 50},
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Behaviour class.
    pub kind: InfraKind,
    /// Construction cost before the faction cost modifier.
    #[serde(default)]
    pub cost: BTreeMap<String, u32>,
    /// Extra storage capacity per tier while owned.
    #[serde(default)]
    pub storage: BTreeMap<ResourceTier, u32>,
    /// Research points generated per tick.
    #[serde(default)]
    pub research_points: u32,
    /// Side length of the square footprint.
    #[serde(default = "default_size")]
    pub size: u32,
}

const fn default_size() -> u32 {
    1
}

impl InfrastructureData {
    /// Whether this counts toward settlement capacity.
    #[must_use]
    pub const fn is_settlement(&self) -> bool {
        matches!(self.kind, InfraKind::Settlement { .. })
    }

    /// Population supported, zero for non-settlements.
    #[must_use]
    pub const fn population_capacity(&self) -> u32 {
        match self.kind {
            InfraKind::Settlement {
                population_capacity,
                ..
            } => population_capacity,
            _ => 0,
        }
    }

    /// Settlement tier, zero for non-settlements.
    #[must_use]
    pub const fn settlement_tier(&self) -> u8 {
        match self.kind {
            InfraKind::Settlement { tier, .. } => tier,
            _ => 0,
        }
    }

    /// The upgrade path, if this is an upgradable settlement.
    #[must_use]
    pub fn upgrade(&self) -> Option<&UpgradePath> {
        match &self.kind {
            InfraKind::Settlement { upgrade, .. } => upgrade.as_ref(),
            _ => None,
        }
    }

    /// Resource this structure produces, if any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match &self.kind {
            InfraKind::Extractor { resource, .. } => Some(resource),
            InfraKind::Processor { output, .. } => Some(output),
            InfraKind::Settlement { .. } | InfraKind::Facility => None,
        }
    }
}
