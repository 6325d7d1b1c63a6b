//! End-to-end runs of the `smartcab` binary: `train` on a scripted
//! environment, then `report` on the stats it wrote.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

const SCRIPT: &str = r#"{"trial": 1, "waypoint": "forward", "deadline": 2, "inputs": {"light": "green", "oncoming": null, "left": null, "right": null}, "rewards": {"none": 0.0, "forward": 2.0, "left": -0.5, "right": -0.5}, "destination": [3, 4]}
{"trial": 1, "waypoint": "left", "deadline": 1, "inputs": {"light": "green", "oncoming": "forward", "left": null, "right": null}, "rewards": {"none": 0.0, "forward": -0.5, "left": 12.0, "right": -0.5}, "reached": true}
{"trial": 2, "waypoint": "right", "deadline": 3, "inputs": {"light": "red", "oncoming": null, "left": "forward", "right": null}, "rewards": {"none": 1.0, "forward": -1.0, "left": -1.0, "right": 2.0}, "destination": [6, 1]}
"#;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("smartcab_cli_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap_or_else(|e| panic!("Failed to create temp dir: {e}"));
    dir
}

fn smartcab() -> Command {
    Command::cargo_bin("smartcab").unwrap_or_else(|e| panic!("binary not built: {e}"))
}

#[test]
fn train_then_report() {
    let dir = temp_dir("train");
    let script = dir.join("script.jsonl");
    fs::write(&script, SCRIPT).unwrap_or_else(|e| panic!("Failed to write script: {e}"));
    let stats = dir.join("stats").join("run.json");
    let trace = dir.join("trace.jsonl");

    smartcab()
        .args(["train", "--seed", "7", "--trials", "3", "--dump-q"])
        .arg("--script")
        .arg(&script)
        .arg("--stats-file")
        .arg(&stats)
        .arg("--trace-file")
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 3 steps in 2 trials"))
        .stdout(predicate::str::contains("Trial 6:"))
        .stdout(predicate::str::contains("\"states\": 512"));

    let log: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(&stats).unwrap_or_else(|e| panic!("stats missing: {e}")),
    )
    .unwrap_or_else(|e| panic!("stats not JSON: {e}"));
    assert_eq!(log["outcomes"].as_array().map(Vec::len), Some(6));

    let trace = fs::read_to_string(&trace).unwrap_or_else(|e| panic!("trace missing: {e}"));
    for line in trace.lines() {
        let v: serde_json::Value =
            serde_json::from_str(line).unwrap_or_else(|e| panic!("bad trace line: {e}"));
        assert!(v["state"].is_object());
        assert!(v["ts"].is_string());
    }

    smartcab()
        .args(["report", "--window", "2", "--min-trials", "2"])
        .arg("--stats-file")
        .arg(&stats)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"trials_analyzed\": 6"))
        .stdout(predicate::str::contains("\"learning_curve\""));
}

fn recorded_epsilon(stats: &std::path::Path, trial: usize) -> f64 {
    let log: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(stats).unwrap_or_else(|e| panic!("stats missing: {e}")),
    )
    .unwrap_or_else(|e| panic!("stats not JSON: {e}"));
    log["outcomes"][trial - 1]["epsilon"]
        .as_f64()
        .unwrap_or_else(|| panic!("no epsilon for trial {trial}"))
}

#[test]
fn decay_flag_selects_the_schedule() {
    let dir = temp_dir("decay");
    let script = dir.join("script.jsonl");
    fs::write(
        &script,
        r#"{"trial": 1, "waypoint": "forward", "deadline": 5, "inputs": {"light": "green"}, "rewards": {"forward": 2.0}, "reached": true}"#,
    )
    .unwrap_or_else(|e| panic!("Failed to write script: {e}"));

    let mut epsilons = Vec::new();
    for decay in ["baseline", "compounding"] {
        let stats = dir.join(format!("{decay}.json"));
        smartcab()
            .args(["train", "--seed", "3", "--trials", "101", "--decay", decay])
            .arg("--script")
            .arg(&script)
            .arg("--stats-file")
            .arg(&stats)
            .assert()
            .success();
        epsilons.push(recorded_epsilon(&stats, 101));
    }

    // trial 101 divides the configured 0.3 by 1 + 100/100
    assert!((epsilons[0] - 0.15).abs() < 1e-12, "baseline {}", epsilons[0]);
    assert!(epsilons[1] < 1e-10, "compounding {}", epsilons[1]);
}

#[test]
fn train_rejects_out_of_range_parameters() {
    let dir = temp_dir("bad_alpha");
    let script = dir.join("script.jsonl");
    fs::write(&script, SCRIPT).unwrap_or_else(|e| panic!("Failed to write script: {e}"));

    smartcab()
        .args(["train", "--alpha", "0"])
        .arg("--script")
        .arg(&script)
        .arg("--stats-file")
        .arg(dir.join("stats.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("alpha"));
}

#[test]
fn train_rejects_unknown_light() {
    let dir = temp_dir("bad_light");
    let script = dir.join("script.jsonl");
    fs::write(
        &script,
        r#"{"trial": 1, "waypoint": "left", "deadline": 5, "inputs": {"light": "amber"}}"#,
    )
    .unwrap_or_else(|e| panic!("Failed to write script: {e}"));

    smartcab()
        .arg("train")
        .arg("--script")
        .arg(&script)
        .arg("--stats-file")
        .arg(dir.join("stats.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("amber"));
}

#[test]
fn report_fails_without_stats() {
    let dir = temp_dir("no_stats");
    smartcab()
        .arg("report")
        .arg("--stats-file")
        .arg(dir.join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open stats"));
}
