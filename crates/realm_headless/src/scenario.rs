//! Scenario loading and world setup.
//!
//! A scenario is a RON document naming a world generation config plus a
//! few starting relations. Building one against a catalog produces the
//! initial [`GameState`].

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use realm_core::data::Catalog;
use realm_core::error::GameError;
use realm_core::factions::DiplomacyStatus;
use realm_core::simulation::Simulation;
use realm_core::state::GameState;
use realm_core::worldgen::{WorldBuilder, WorldConfig};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The engine rejected the catalog or the world.
    #[error(transparent)]
    Engine(#[from] GameError),
    /// The catalog loaded but references are broken.
    #[error("Catalog has {} problem(s): {}", .0.len(), .0.join("; "))]
    InvalidCatalog(Vec<String>),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Seed used when the caller does not pick one.
    #[serde(default)]
    pub seed: u64,
    /// World generation parameters.
    pub world: WorldConfig,
    /// Starting opinions as `(holder, target, value)`.
    #[serde(default)]
    pub opinions: Vec<(String, String, i32)>,
    /// Starting stances, applied to both sides.
    #[serde(default)]
    pub relations: Vec<(String, String, DiplomacyStatus)>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable or malformed.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse a scenario from RON text.
    ///
    /// # Errors
    ///
    /// Fails if the text is not a valid scenario document.
    pub fn from_ron_str(text: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(text)?)
    }

    /// Two shipped factions on a small generated map.
    #[must_use]
    pub fn skirmish() -> Self {
        let world = WorldConfig::small()
            .with_faction("ironhold")
            .with_faction("greenmantle");
        Self {
            name: "skirmish".to_string(),
            description: "Two factions on a small continent".to_string(),
            seed: 7,
            world,
            opinions: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Generate the world and apply starting relations.
    ///
    /// # Errors
    ///
    /// Fails when the scenario names ids the catalog does not define.
    pub fn build(&self, catalog: &Catalog, seed: u64) -> Result<GameState, ScenarioError> {
        let mut world = WorldBuilder::generate(catalog, &self.world, seed)?;
        for (a, b, status) in &self.relations {
            world.relation(a, b, *status)?;
        }
        for (holder, target, opinion) in &self.opinions {
            world.opinion(holder, target, *opinion)?;
        }
        tracing::info!(
            scenario = %self.name,
            seed,
            factions = self.world.factions.len(),
            "Scenario built"
        );
        Ok(world.build())
    }

    /// Build a ready-to-run simulation.
    ///
    /// # Errors
    ///
    /// See [`Scenario::build`].
    pub fn simulation(&self, catalog: Arc<Catalog>, seed: u64) -> Result<Simulation, ScenarioError> {
        let state = self.build(&catalog, seed)?;
        Ok(Simulation::new(catalog, state, seed))
    }
}

/// Load a catalog file or directory and reject it if any reference is broken.
///
/// # Errors
///
/// Returns [`ScenarioError::Engine`] for unreadable data and
/// [`ScenarioError::InvalidCatalog`] listing every validation problem.
pub fn load_catalog(path: &Path) -> Result<Catalog, ScenarioError> {
    let catalog = Catalog::load(path)?;
    let problems = catalog.validate();
    if !problems.is_empty() {
        return Err(ScenarioError::InvalidCatalog(problems));
    }
    tracing::debug!(path = %path.display(), "Catalog loaded");
    Ok(catalog)
}
