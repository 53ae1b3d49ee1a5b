//! Versioned JSON snapshots of a running world.
//!
//! A snapshot carries the state, the random stream position and the
//! seed, so a restored simulation continues exactly where it stopped.
//! The catalog is not included; it is supplied again on restore.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::Catalog;
use crate::error::{GameError, Result};
use crate::rng::SimRng;
use crate::simulation::Simulation;
use crate::state::GameState;

/// Snapshot document format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A complete, restorable picture of a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Document format version.
    pub version: u32,
    /// Seed the stream started from.
    pub seed: u64,
    /// Stream position.
    pub rng: SimRng,
    /// World state.
    pub state: GameState,
}

impl Snapshot {
    /// Capture a simulation as it stands.
    #[must_use]
    pub fn capture(sim: &Simulation) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            seed: sim.seed(),
            rng: sim.rng().clone(),
            state: sim.state().clone(),
        }
    }

    /// Pretty-printed JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize snapshot: {e}")))
    }

    /// Parse a JSON document, checking its version.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or a version mismatch.
    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(text).map_err(|e| GameError::DataParse {
            path: "<snapshot>".to_string(),
            message: e.to_string(),
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GameError::InvalidState(format!(
                "Snapshot version mismatch: expected {SNAPSHOT_VERSION}, got {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Write the JSON document to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_json()?;
        std::fs::write(path, text).map_err(|e| {
            GameError::InvalidState(format!("Failed to write snapshot '{}': {e}", path.display()))
        })
    }

    /// Read a JSON document from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or parsing fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GameError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Rebuild a simulation against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] listing every broken invariant
    /// if the state is inconsistent with the catalog.
    pub fn restore(self, catalog: Arc<Catalog>) -> Result<Simulation> {
        let problems = self.state.check_invariants(&catalog);
        if !problems.is_empty() {
            return Err(GameError::InvalidState(format!(
                "Snapshot violates {} invariant(s): {}",
                problems.len(),
                problems.join("; ")
            )));
        }
        Ok(Simulation::from_parts(catalog, self.state, self.rng, self.seed))
    }
}

impl Simulation {
    /// Capture a [`Snapshot`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Restore from a [`Snapshot`].
    ///
    /// # Errors
    ///
    /// See [`Snapshot::restore`].
    pub fn from_snapshot(catalog: Arc<Catalog>, snapshot: Snapshot) -> Result<Self> {
        snapshot.restore(catalog)
    }
}
