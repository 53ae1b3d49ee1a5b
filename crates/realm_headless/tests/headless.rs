//! End-to-end runs through the headless driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use realm_core::replay::Replay;
use realm_core::snapshot::Snapshot;
use realm_headless::{load_catalog, GameMetrics, HeadlessConfig, HeadlessRunner, Scenario};
use realm_test_utils::invariants::assert_invariants;

fn asset(path: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets").join(path)
}

#[test]
fn test_snapshot_resume_matches_uninterrupted_run() {
    let catalog = Arc::new(load_catalog(&asset("data")).unwrap());
    let scenario = Scenario::load(&asset("scenarios/three_crowns.ron")).unwrap();

    let mut straight = HeadlessRunner::new(scenario.simulation(Arc::clone(&catalog), 11).unwrap());
    straight.run_ticks(3_000);

    let mut first = HeadlessRunner::with_config(
        scenario.simulation(Arc::clone(&catalog), 11).unwrap(),
        HeadlessConfig {
            speed: 25,
            progress_every: 0,
        },
    );
    first.run_ticks(1_234);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mid.json");
    first.snapshot().save(&path).unwrap();

    let restored = Snapshot::load(&path).unwrap().restore(Arc::clone(&catalog)).unwrap();
    let mut second = HeadlessRunner::new(restored);
    second.run_ticks(3_000 - 1_234);

    assert_eq!(second.simulation().tick_count(), 3_000);
    assert_eq!(
        second.simulation().state_hash(),
        straight.simulation().state_hash()
    );
    assert_invariants(second.simulation().state(), &catalog);
}

#[test]
fn test_replay_of_scenario_verifies() {
    let catalog = Arc::new(load_catalog(&asset("data")).unwrap());
    let scenario = Scenario::load(&asset("scenarios/skirmish.ron")).unwrap();
    let mut sim = scenario.simulation(Arc::clone(&catalog), scenario.seed).unwrap();
    let replay = Replay::record(scenario.name.clone(), &mut sim, 2_000, 250).unwrap();
    assert_eq!(replay.checkpoints.len(), 8);
    replay.verify(catalog).unwrap();
}

#[test]
fn test_metrics_serialize_as_json() {
    let catalog = Arc::new(load_catalog(&asset("data")).unwrap());
    let scenario = Scenario::skirmish();
    let mut runner = HeadlessRunner::new(scenario.simulation(Arc::clone(&catalog), 5).unwrap());
    runner.run_ticks(1_000);
    let sim = runner.simulation();
    let metrics = GameMetrics::collect(
        scenario.name.clone(),
        5,
        sim.state(),
        sim.catalog(),
        runner.notifications(),
    );
    let json = serde_json::to_string(&metrics).unwrap();
    let back: GameMetrics = serde_json::from_str(&json).unwrap();
    assert_eq!(back.final_state_hash, sim.state_hash());
    assert_eq!(back.factions.len(), 2);
    assert!(back.factions.contains_key("ironhold"));
}
