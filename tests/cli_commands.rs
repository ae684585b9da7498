use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

fn root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Config file whose stores live in a fresh temp dir
fn temp_config() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let yaml = format!(
        "storage:\n  rules_path: {}\n  memory_path: {}\n",
        dir.path().join("rules.yaml").display(),
        dir.path().join("memory.json").display()
    );
    std::fs::write(&path, yaml).unwrap();
    (dir, path)
}

fn runner(config: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("adaptive-runner");
    let mut cmd = Command::new(bin);
    cmd.current_dir(root())
        .env_remove("RUST_LOG")
        .args(["--config", config.to_str().unwrap()]);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn classify_prints_reason() {
    let (_dir, config) = temp_config();
    let assert = runner(&config)
        .args(["classify", "Timeout 30000ms exceeded"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.trim(), "timeout");
}

#[test]
fn run_checkout_demo_recovers() {
    let (dir, config) = temp_config();
    let assert = runner(&config)
        .args([
            "--output",
            "json",
            "run",
            "demos/tasks/01-checkout.yaml",
            "--fixture",
            "demos/fixtures/shop.yaml",
        ])
        .assert()
        .success();

    let report = stdout_json(assert.get_output());
    assert_eq!(report["succeeded"], 1);
    let attempts = report["tasks"][0]["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["outcome"]["reason"], "selector-not-found");
    assert_eq!(attempts[1]["ruleId"], "infer-selector");
    assert!(dir.path().join("rules.yaml").exists());
}

#[test]
fn run_with_unrecoverable_task_fails() {
    let (_dir, config) = temp_config();
    runner(&config)
        .args(["run", "demos/tasks", "--fixture", "demos/fixtures/shop.yaml"])
        .assert()
        .failure();
}

#[test]
fn rules_list_shows_defaults() {
    let (dir, config) = temp_config();
    let assert = runner(&config)
        .args(["--output", "json", "rules", "list"])
        .assert()
        .success();
    let rules = stdout_json(assert.get_output());
    let ids: Vec<&str> = rules
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|rule| rule["id"].as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "infer-selector",
            "extend-timeout",
            "alternate-route-navigation",
            "alternate-route-unexpected"
        ]
    );
    // listing never creates the store
    assert!(!dir.path().join("rules.yaml").exists());
}

#[test]
fn rules_feedback_and_reset() {
    let (_dir, config) = temp_config();
    let assert = runner(&config)
        .args(["--output", "json", "rules", "feedback", "extend-timeout", "failure"])
        .assert()
        .success();
    let rule = stdout_json(assert.get_output());
    assert_eq!(rule["metadata"]["status"], "penalized");

    runner(&config)
        .args(["rules", "reset", "extend-timeout", "--weight", "0.1"])
        .assert()
        .failure();

    runner(&config)
        .args(["rules", "show", "no-such-rule"])
        .assert()
        .failure();
}

#[test]
fn strategies_for_test_id() {
    let (_dir, config) = temp_config();
    let assert = runner(&config)
        .args(["--output", "json", "strategies", "--test-id", "submit", "--id", "go"])
        .assert()
        .success();
    let strategies = stdout_json(assert.get_output());
    let list = strategies.as_array().unwrap();
    assert_eq!(list[0]["selector"], "[data-testid=\"submit\"]");
    assert_eq!(list[0]["type"], "testid");
    assert_eq!(list[0]["confidence"], 1.0);
    assert!(list.iter().any(|s| s["selector"] == "#go"));
}
