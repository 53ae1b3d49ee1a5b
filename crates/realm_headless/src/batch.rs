//! Batch runner for many seeds of one scenario.
//!
//! Runs worlds in parallel using rayon and collects [`GameMetrics`] for
//! each. Every run is independent, so results do not depend on thread
//! count or scheduling.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use realm_core::data::Catalog;

use crate::metrics::{BatchSummary, GameMetrics};
use crate::runner::HeadlessRunner;
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of runs.
    pub game_count: u32,
    /// Seed of the first run; run `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Ticks per run.
    pub ticks: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 16,
            seed_start: 0,
            ticks: 10_000,
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` runs.
    #[must_use]
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set ticks per run.
    #[must_use]
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name.
    pub scenario: String,
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual run metrics, in seed order.
    pub games: Vec<GameMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Errors encountered.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the file written.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file is unreadable or not a results document.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Run index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

fn run_single_game(
    scenario: &Scenario,
    catalog: &Arc<Catalog>,
    seed: u64,
    ticks: u64,
) -> Result<GameMetrics, String> {
    let simulation = scenario
        .simulation(Arc::clone(catalog), seed)
        .map_err(|e| e.to_string())?;
    let mut runner = HeadlessRunner::new(simulation);
    runner.run_ticks(ticks);
    let sim = runner.simulation();
    debug!(seed, hash = sim.state_hash(), "Run finished");
    Ok(GameMetrics::collect(
        scenario.name.clone(),
        seed,
        sim.state(),
        sim.catalog(),
        runner.notifications(),
    ))
}

/// Run every seed of a batch in parallel.
#[must_use]
pub fn run_batch(scenario: &Scenario, catalog: Arc<Catalog>, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        scenario = %scenario.name,
        games = config.game_count,
        seed_start = config.seed_start,
        ticks = config.ticks,
        "Starting batch"
    );

    let outcomes: Vec<(u32, u64, Result<GameMetrics, String>)> = (0..config.game_count)
        .into_par_iter()
        .map(|index| {
            let seed = config.seed_start.wrapping_add(u64::from(index));
            (index, seed, run_single_game(scenario, &catalog, seed, config.ticks))
        })
        .collect();

    let mut games = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (game_index, seed, outcome) in outcomes {
        match outcome {
            Ok(metrics) => games.push(metrics),
            Err(message) => {
                warn!(game_index, seed, error = %message, "Run failed");
                errors.push(BatchError {
                    game_index,
                    seed,
                    message,
                });
            }
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        completed = games.len(),
        failed = errors.len(),
        duration_seconds,
        "Batch complete"
    );

    BatchResults {
        scenario: scenario.name.clone(),
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_test_utils::fixtures::shipped_catalog;

    fn small_batch(count: u32) -> BatchResults {
        let catalog = Arc::new(shipped_catalog());
        let config = BatchConfig::new(count).with_seed(40).with_ticks(600);
        run_batch(&Scenario::skirmish(), catalog, config)
    }

    #[test]
    fn test_batch_runs_every_seed_in_order() {
        let results = small_batch(4);
        assert!(results.errors.is_empty(), "{:?}", results.errors);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![40, 41, 42, 43]);
        assert!(results.games.iter().all(|g| g.ticks == 600));
        assert_eq!(results.summary.total_games, 4);
    }

    #[test]
    fn test_batch_is_deterministic() {
        let a = small_batch(3);
        let b = small_batch(3);
        let hashes = |r: &BatchResults| -> Vec<u64> {
            r.games.iter().map(|g| g.final_state_hash).collect()
        };
        assert_eq!(hashes(&a), hashes(&b));
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_failures_are_collected() {
        let catalog = Arc::new(shipped_catalog());
        let mut scenario = Scenario::skirmish();
        scenario.world = scenario.world.with_faction("nobody");
        let results = run_batch(&scenario, catalog, BatchConfig::new(2).with_ticks(10));
        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 2);
        assert!(results.errors[0].message.contains("nobody"));
    }

    #[test]
    fn test_results_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("batch.json");
        let results = small_batch(2);
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games.len(), 2);
        assert_eq!(loaded.summary.total_games, results.summary.total_games);
        assert_eq!(loaded.games[0].final_state_hash, results.games[0].final_state_hash);
    }
}
