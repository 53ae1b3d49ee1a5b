//! Error types for the world simulation.
//!
//! Nothing inside a tick returns these: every phase turns a failed attempt
//! into a skip. They surface from loading, building and persistence APIs.

use thiserror::Error;

use crate::math::Fixed;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// A catalog id that cannot be resolved.
    #[error("Unknown {kind} definition: {id}")]
    MissingDefinition {
        /// Which table was searched (e.g. "unit", "biome").
        kind: &'static str,
        /// The id that failed to resolve.
        id: String,
    },

    /// Faction id not present in the world.
    #[error("Unknown faction: {0}")]
    UnknownFaction(String),

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource id.
        resource: String,
        /// Amount required.
        required: Fixed,
        /// Amount available.
        available: Fixed,
    },

    /// No valid site for a structure or unit.
    #[error("Invalid placement at ({x}, {y}): {reason}")]
    InvalidPlacement {
        /// Tile column.
        x: u32,
        /// Tile row.
        y: u32,
        /// Why the tile was rejected.
        reason: String,
    },

    /// Invalid world state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Replay diverged from its recording.
    #[error("Desync detected at tick {tick}: expected hash {expected}, got {actual}")]
    Desync {
        /// Tick at which the hashes were compared.
        tick: u64,
        /// Recorded hash.
        expected: u64,
        /// Recomputed hash.
        actual: u64,
    },
}

impl GameError {
    /// Shorthand for [`GameError::MissingDefinition`].
    #[must_use]
    pub fn missing(kind: &'static str, id: impl Into<String>) -> Self {
        Self::MissingDefinition {
            kind,
            id: id.into(),
        }
    }
}
