//! Technology definitions unlocked by research.

use serde::{Deserialize, Serialize};

use crate::modifiers::TraitEffect;

/// Data-driven technology definition.
///
/// Unlocking a tech adds its effects to the owning faction's modifier pool.
///
/// # Example RON
///
/// ```ron
/// TechData(
///     id: "crop_rotation",
///     name: "Crop Rotation",
///     cost: 2000,
///     effects: [PopulationGrowth(percent: 25)],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Research points consumed on unlock.
    pub cost: u64,
    /// Effects granted once unlocked.
    #[serde(default)]
    pub effects: Vec<TraitEffect>,
}
