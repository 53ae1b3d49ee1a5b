//! Faction definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::modifiers::TraitEffect;

/// AI personality weights, each on a 0-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    /// Raises the war threshold and the chance of declaring.
    #[serde(default = "default_trait")]
    pub aggression: u32,
    /// Lowers the opinion needed to ally.
    #[serde(default = "default_trait")]
    pub diplomacy: u32,
    /// Chance per expansion cadence, in twentieths.
    #[serde(default = "default_trait")]
    pub expansion: u32,
}

const fn default_trait() -> u32 {
    5
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            aggression: default_trait(),
            diplomacy: default_trait(),
            expansion: default_trait(),
        }
    }
}

/// Upper bound for every personality trait.
pub const MAX_PERSONALITY: u32 = 10;

/// Complete faction definition.
///
/// # Example RON
///
/// ```ron
/// FactionData(
///     id: "sylvan",
///     name: "Sylvan Concord",
///     personality: (aggression: 3, diplomacy: 8, expansion: 6),
///     traits: [Production(tier: Some(Raw), percent: 10)],
///     leader: "sylvan_warden",
///     settlement: "hamlet",
///     roster: ["worker", "archer"],
///     buildable: ["lumber_camp", "sawmill"],
///     starting_units: ["worker", "worker"],
///     starting_resources: {"wood": 50, "food": 50},
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// AI personality.
    #[serde(default)]
    pub personality: Personality,
    /// Faction-wide trait effects.
    #[serde(default)]
    pub traits: Vec<TraitEffect>,
    /// Hero unit type sent on adventures.
    pub leader: String,
    /// Optional escort unit type for adventures.
    #[serde(default)]
    pub escort: Option<String>,
    /// Starting settlement infrastructure.
    pub settlement: String,
    /// Trainable unit types.
    #[serde(default)]
    pub roster: Vec<String>,
    /// Infrastructure the expansion AI may construct.
    #[serde(default)]
    pub buildable: Vec<String>,
    /// Units placed around the start settlement.
    #[serde(default)]
    pub starting_units: Vec<String>,
    /// Initial stock.
    #[serde(default)]
    pub starting_resources: BTreeMap<String, u32>,
}
