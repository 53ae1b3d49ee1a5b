//! Terrain, resource and world-event definitions.

use serde::{Deserialize, Serialize};

/// Resource classification bucket.
///
/// Storage capacity is tracked per tier and production bonuses can be
/// scoped to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceTier {
    /// Harvested straight from a deposit.
    Raw,
    /// Refined from raw inputs.
    Processed,
    /// Built from processed goods.
    Component,
    /// Rare or magical goods.
    Exotic,
}

impl ResourceTier {
    /// All tiers, in order.
    pub const ALL: [Self; 4] = [Self::Raw, Self::Processed, Self::Component, Self::Exotic];
}

/// How often a deposit reappears on a depleted tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Rarity {
    /// 50% respawn chance.
    #[default]
    Common,
    /// 25% respawn chance.
    Uncommon,
    /// 10% respawn chance.
    Rare,
    /// 3% respawn chance.
    Legendary,
}

impl Rarity {
    /// Percent chance that a cooled-down tile regrows this deposit per sweep.
    #[must_use]
    pub const fn spawn_chance(self) -> u32 {
        match self {
            Self::Common => 50,
            Self::Uncommon => 25,
            Self::Rare => 10,
            Self::Legendary => 3,
        }
    }
}

/// Data-driven resource definition.
///
/// # Example RON
///
/// ```ron
/// ResourceData(
///     id: "iron_ore",
///     name: "Iron Ore",
///     tier: Raw,
///     rarity: Uncommon,
///     respawn_time: 600,
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Storage tier.
    pub tier: ResourceTier,
    /// Respawn rarity.
    #[serde(default)]
    pub rarity: Rarity,
    /// Ticks a depleted tile waits before it may regrow this deposit.
    #[serde(default = "default_respawn_time")]
    pub respawn_time: u64,
    /// Minted currency. Processors producing it feed the world accumulator.
    #[serde(default)]
    pub mint: bool,
}

const fn default_respawn_time() -> u64 {
    500
}

/// Data-driven biome definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomeData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Movement friction. A step into this biome succeeds with chance
    /// `1 / move_cost`; zero means impassable.
    #[serde(default = "default_move_cost")]
    pub move_cost: u32,
    /// Attack bonus (percent) for a unit striking from this terrain.
    #[serde(default)]
    pub attack_bonus: i32,
    /// Damage reduction (percent) for a unit defending on this terrain.
    #[serde(default)]
    pub defense_bonus: i32,
    /// Resource ids that may appear as deposits here.
    #[serde(default)]
    pub deposits: Vec<String>,
    /// Percent chance of a deposit per tile at world generation.
    #[serde(default = "default_deposit_chance")]
    pub deposit_chance: u32,
    /// Band order for world generation, low to high.
    #[serde(default)]
    pub elevation: u32,
}

const fn default_move_cost() -> u32 {
    1
}

const fn default_deposit_chance() -> u32 {
    10
}

impl BiomeData {
    /// Whether units may enter this biome.
    #[must_use]
    pub const fn is_passable(&self) -> bool {
        self.move_cost > 0
    }
}

/// Data-driven world-event definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEventData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Log text shown when the event appears.
    #[serde(default)]
    pub description: String,
    /// Ticks the marker stays on the map.
    pub duration: u64,
    /// Hostile unit type spawned around the event, if any.
    #[serde(default)]
    pub spawns: Option<String>,
    /// How many units to spawn.
    #[serde(default)]
    pub spawn_count: u32,
    /// Items carried by spawned units.
    #[serde(default)]
    pub loot: Vec<String>,
}
