//! Headless world runner for CI and long unattended runs.
//!
//! This crate drives a [`realm_core`] world without any interface:
//!
//! - **Scenarios**: RON files describing a generated world
//! - **Runs**: a speed-controlled driver loop with snapshot output
//! - **Batches**: many seeds in parallel, summarized as JSON
//! - **Verification**: determinism and replay checks
//!
//! # Example
//!
//! ```bash
//! # Run a scenario for ten in-world years and save a snapshot
//! cargo run -p realm_headless -- run --scenario assets/scenarios/skirmish.ron \
//!     --ticks 10000 --snapshot out.json
//!
//! # Pick up where it stopped
//! cargo run -p realm_headless -- resume --snapshot out.json --ticks 5000
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, FactionMetrics, GameMetrics};
pub use runner::{HeadlessConfig, HeadlessRunner, NotificationCounter};
pub use scenario::{load_catalog, Scenario, ScenarioError};
