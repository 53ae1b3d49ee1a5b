//! # Realm Core
//!
//! Deterministic tick engine for a persistent strategy world.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO outside explicit load/save helpers
//! - No system randomness (one seeded [`rng::SimRng`] per world)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless and batch runs
//! - Snapshots that resume mid-stream
//! - Replay verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`data`] - Immutable catalog of static definitions
//! - [`grid`] / [`state`] - The world and its read-only query surface
//! - [`economy`] / [`population`] - Production, storage, growth, research
//! - [`ai`] - Per-faction management, leader, diplomacy and expansion
//! - [`movement`] / [`combat`] - Unit intents and exchanges of blows
//! - [`simulation`] - The tick orchestrator
//! - [`snapshot`] / [`replay`] - Persistence and verification
//! - [`worldgen`] - World builder and procedural generation

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod combat;
pub mod components;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod factions;
pub mod grid;
pub mod math;
pub mod modifiers;
pub mod movement;
pub mod population;
pub mod replay;
pub mod rng;
pub mod simulation;
pub mod snapshot;
pub mod spawner;
pub mod state;
pub mod worldgen;

#[cfg(test)]
mod test_fixtures;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::{UnitId, UnitInstance};
    pub use crate::data::{Catalog, ResourceTier, UnitRole};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventCategory, LogEntry, Notification, NotificationSink, NullSink};
    pub use crate::factions::{DiplomacyStatus, FactionId, FactionState, HOSTILE_FACTION};
    pub use crate::grid::{Tile, TilePos};
    pub use crate::math::Fixed;
    pub use crate::replay::Replay;
    pub use crate::rng::SimRng;
    pub use crate::simulation::{advance, Simulation, TickEvents};
    pub use crate::snapshot::Snapshot;
    pub use crate::state::{Epoch, GameState};
    pub use crate::worldgen::{generate_world, WorldBuilder, WorldConfig};
}
