//! JSON snapshots survive disk and resume the same timeline.

use std::sync::Arc;

use realm_core::error::GameError;
use realm_core::simulation::Simulation;
use realm_core::snapshot::{Snapshot, SNAPSHOT_VERSION};
use realm_test_utils::determinism::verify_snapshot_determinism;
use realm_test_utils::fixtures::{generated_simulation, shipped_catalog, shipped_config, simulation};

#[test]
fn snapshot_file_resumes_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.json");

    let mut original = generated_simulation(&shipped_config(), 404);
    original.run(1_234);
    original.snapshot().save(&path).unwrap();

    let loaded = Snapshot::load(&path).unwrap();
    assert_eq!(loaded.version, SNAPSHOT_VERSION);
    assert_eq!(loaded.seed, 404);
    let mut resumed = Simulation::from_snapshot(Arc::new(shipped_catalog()), loaded).unwrap();
    assert_eq!(resumed.tick_count(), 1_234);
    assert_eq!(resumed.state_hash(), original.state_hash());

    original.run(800);
    resumed.run(800);
    assert_eq!(resumed.state_hash(), original.state_hash());
}

#[test]
fn snapshot_preserves_log_and_markers() {
    let mut sim = simulation(90);
    sim.run(2_100);
    let text = sim.snapshot().to_json().unwrap();
    let back = Snapshot::from_json(&text).unwrap();

    let original = sim.state();
    assert_eq!(back.state.event_log(), original.event_log());
    assert_eq!(back.state.dying(), original.dying());
    assert_eq!(back.state.year(), 2);
    assert_eq!(back.state.minted(), original.minted());
    assert_eq!(back.state.world_athar(), original.world_athar());
}

#[test]
fn snapshot_resume_continues_the_stream() {
    assert!(verify_snapshot_determinism(|| simulation(3), 1_010, 1_000));
}

#[test]
fn unreadable_snapshots_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(matches!(
        Snapshot::load(&missing),
        Err(GameError::DataParse { .. })
    ));

    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, "{\"version\": 1}").unwrap();
    assert!(Snapshot::load(&garbage).is_err());
}

#[test]
fn snapshot_against_wrong_catalog_is_rejected() {
    let mut sim = generated_simulation(&shipped_config(), 5);
    sim.run(100);
    let snapshot = sim.snapshot();
    // the test catalog knows none of the shipped factions or structures
    let small = Arc::new(realm_test_utils::fixtures::test_catalog());
    let err = snapshot.restore(small).unwrap_err();
    assert!(matches!(err, GameError::InvalidState(_)));
}
