//! Checks for the scenario files shipped with the runner.

use std::path::PathBuf;

use drone_core::factions::FactionId;
use drone_headless::{run_scenario, HeadlessRunner, Response, Scenario};

fn skirmish_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios/skirmish.ron")
}

// ===== Loading =====

#[test]
fn test_skirmish_loads() {
    let scenario = Scenario::load(skirmish_path()).unwrap();
    assert_eq!(scenario.name, "Skirmish");
    assert_eq!(scenario.config.obstacles.len(), 1);
    assert_eq!(scenario.timeline.len(), 3);
}

// ===== Scripted runs =====

#[test]
fn test_skirmish_runs_and_reinforces_red() {
    let scenario = Scenario::load(skirmish_path()).unwrap();
    let report = run_scenario(&scenario, None).unwrap();

    assert_eq!(report.frames, scenario.frames());
    assert_eq!(report.drones[FactionId::Blue], 5);
    assert_eq!(report.drones[FactionId::Red], 9);
    assert_eq!(report.controls_applied, 3);
    assert!(report.resources[FactionId::Blue] + report.resources[FactionId::Red] > 0);
}

#[test]
fn test_skirmish_is_reproducible() {
    let scenario = Scenario::load(skirmish_path()).unwrap();
    let first = run_scenario(&scenario, Some(900)).unwrap();
    let second = run_scenario(&scenario, Some(900)).unwrap();
    assert_eq!(first, second);
}

// ===== Interactive session =====

#[test]
fn test_session_hash_matches_scripted_run() {
    let scenario = Scenario {
        timeline: Vec::new(),
        ..Scenario::load(skirmish_path()).unwrap()
    };
    let scripted = run_scenario(&scenario, Some(120)).unwrap();

    let mut runner = HeadlessRunner::from_scenario(&scenario).unwrap();
    runner.handle_line(r#"{"cmd":"tick","count":120}"#);
    let response = runner.handle_line(r#"{"cmd":"hash"}"#).unwrap();

    assert_eq!(
        response,
        Response::Hash {
            frame: 120,
            hash: scripted.final_hash
        }
    );
}
