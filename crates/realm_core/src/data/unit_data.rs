//! Unit and item definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Broad unit class. Drives intent selection and trait filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitRole {
    /// Harvests and builds.
    Worker,
    /// Regular combatant.
    Soldier,
    /// Faction leader. Never trained, only spawned for adventures.
    Hero,
    /// Wild creature belonging to the hostile faction.
    Beast,
}

/// Unit stat addressed by a trait effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitStat {
    /// Damage dealt per exchange.
    Attack,
    /// Maximum hit points.
    Hp,
}

/// Per-unit combat trait.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CombatTrait {
    /// Extra damage against defenders carrying `tag`.
    BonusVsTag {
        /// Defender tag.
        tag: String,
        /// Bonus percent.
        percent: i32,
    },
    /// Chance to multiply damage.
    CriticalChance {
        /// Percent chance per exchange.
        chance: u32,
        /// Extra damage percent on a critical hit.
        percent: i32,
    },
    /// Incoming damage reduction.
    DamageReduction {
        /// Reduction percent.
        percent: i32,
    },
    /// Chance to strike before the defender can answer.
    FirstStrike {
        /// Percent chance per exchange.
        chance: u32,
    },
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "spearman",
///     name: "Spearman",
///     role: Soldier,
///     tier: 1,
///     hp: 30,
///     attack: 6,
///     cost: {"food": 10, "iron": 5},
///     train_ticks: 100,
///     tags: ["infantry"],
///     traits: [BonusVsTag(tag: "cavalry", percent: 50)],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit class.
    pub role: UnitRole,
    /// Tech tier; training requires a settlement of at least this tier.
    #[serde(default)]
    pub tier: u8,
    /// Base hit points at level 1.
    pub hp: u32,
    /// Base damage at level 1.
    pub attack: u32,
    /// Training cost before the faction cost modifier.
    #[serde(default)]
    pub cost: BTreeMap<String, u32>,
    /// Ticks spent under construction after training.
    #[serde(default)]
    pub train_ticks: u32,
    /// Tags other units' traits can target.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Combat traits.
    #[serde(default)]
    pub traits: Vec<CombatTrait>,
}

impl UnitData {
    /// Whether this unit type ever takes part in combat voluntarily.
    #[must_use]
    pub const fn can_fight(&self) -> bool {
        self.attack > 0
    }

    /// Whether the definition carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    /// Adds attack.
    Weapon,
    /// Adds hit points.
    Armor,
    /// Anything else, including lore relics.
    Trinket,
}

/// Immutable item definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Slot it occupies when equipped.
    pub slot: EquipSlot,
    /// Flat attack bonus.
    #[serde(default)]
    pub attack: u32,
    /// Flat hit-point bonus.
    #[serde(default)]
    pub hp: u32,
    /// Found by returning heroes.
    #[serde(default)]
    pub lore: bool,
}
