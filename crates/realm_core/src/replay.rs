//! Replay recording and verification.
//!
//! The world takes no external commands, so a replay is just the initial
//! state plus the hashes observed along the way. Re-running from the
//! initial bytes must reproduce every checkpoint; the first mismatch is
//! reported as [`GameError::Desync`].

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::Catalog;
use crate::error::{GameError, Result};
use crate::simulation::Simulation;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Hash observed at a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Tick after which the hash was taken.
    pub tick: u64,
    /// State hash.
    pub hash: u64,
}

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Random seed used for the run.
    pub seed: u64,
    /// Serialized initial simulation.
    pub initial_state: Vec<u8>,
    /// Hashes in tick order.
    pub checkpoints: Vec<Checkpoint>,
    /// Final tick.
    pub final_tick: u64,
    /// Final state hash.
    pub final_hash: u64,
}

impl Replay {
    /// Start a replay from a simulation's current state.
    ///
    /// # Errors
    /// Returns an error if the state cannot be serialized.
    pub fn new(scenario_id: impl Into<String>, initial_state: &Simulation) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            seed: initial_state.seed(),
            initial_state: initial_state.serialize()?,
            checkpoints: Vec::new(),
            final_tick: initial_state.tick_count(),
            final_hash: initial_state.state_hash(),
        })
    }

    /// Run `sim` for `ticks`, checkpointing every `interval` ticks.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be serialized.
    pub fn record(
        scenario_id: impl Into<String>,
        sim: &mut Simulation,
        ticks: u64,
        interval: u64,
    ) -> Result<Self> {
        let mut replay = Self::new(scenario_id, sim)?;
        let interval = interval.max(1);
        for step in 1..=ticks {
            sim.tick();
            if step % interval == 0 {
                replay.checkpoint(sim.tick_count(), sim.state_hash());
            }
        }
        replay.finalize(sim.tick_count(), sim.state_hash());
        Ok(replay)
    }

    /// Record a hash.
    pub fn checkpoint(&mut self, tick: u64, hash: u64) {
        self.checkpoints.push(Checkpoint { tick, hash });
    }

    /// Finalize the replay with end state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Rebuild the initial simulation.
    ///
    /// # Errors
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self, catalog: Arc<Catalog>) -> Result<Simulation> {
        Simulation::deserialize(catalog, &self.initial_state)
    }

    /// Ticks covered.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be decoded.
    pub fn duration(&self, catalog: Arc<Catalog>) -> Result<u64> {
        let start = self.restore_initial_state(catalog)?.tick_count();
        Ok(self.final_tick.saturating_sub(start))
    }

    /// Re-run from the initial state and compare every checkpoint.
    ///
    /// # Errors
    /// Returns [`GameError::Desync`] at the first mismatching hash.
    pub fn verify(&self, catalog: Arc<Catalog>) -> Result<()> {
        let mut sim = self.restore_initial_state(catalog)?;
        let expected = self
            .checkpoints
            .iter()
            .copied()
            .chain(std::iter::once(Checkpoint {
                tick: self.final_tick,
                hash: self.final_hash,
            }));
        for checkpoint in expected {
            while sim.tick_count() < checkpoint.tick {
                sim.tick();
            }
            let actual = sim.state_hash();
            if actual != checkpoint.hash {
                tracing::warn!(tick = checkpoint.tick, "Replay diverged");
                return Err(GameError::Desync {
                    tick: checkpoint.tick,
                    expected: checkpoint.hash,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    catalog: Arc<Catalog>,
    simulation: Simulation,
    start_tick: u64,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Create a new replay player from a replay.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be restored.
    pub fn new(replay: Replay, catalog: Arc<Catalog>) -> Result<Self> {
        let simulation = replay.restore_initial_state(Arc::clone(&catalog))?;
        let start_tick = simulation.tick_count();
        Ok(Self {
            replay,
            catalog,
            simulation,
            start_tick,
            paused: false,
        })
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        if !self.paused && !self.is_finished() {
            self.simulation.tick();
        }
        !self.is_finished()
    }

    /// Seek to a specific tick.
    ///
    /// # Errors
    /// Returns an error if state restoration fails.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        if target_tick < self.simulation.tick_count() {
            self.simulation = self
                .replay
                .restore_initial_state(Arc::clone(&self.catalog))?;
        }
        let target = target_tick.min(self.replay.final_tick);
        while self.simulation.tick_count() < target {
            self.simulation.tick();
        }
        Ok(())
    }

    /// Get the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.simulation.tick_count()
    }

    /// Get a reference to the current simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Get the replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if the replay has finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.simulation.tick_count() >= self.replay.final_tick
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Progress in whole percent.
    #[must_use]
    pub fn progress_percent(&self) -> u64 {
        let total = self.replay.final_tick.saturating_sub(self.start_tick);
        if total == 0 {
            return 100;
        }
        self.current_tick().saturating_sub(self.start_tick) * 100 / total
    }
}
