mod common;

use common::{run_cli, write_file};
use serde_json::Value;

const ENCOUNTER: &str = r"
id: bridge
round: 1
participants:
  - id: kara
    name: Kara
    flags:
      reactionRollResult: 14
  - id: orc
  - id: archer
    flags:
      phase: ranged
      order: 1000
";

const SCRIPT: &str = r"
actions:
  - { action: assign, participant: kara, phase: melee }
  - { action: assign, participant: orc, phase: melee }
  - { action: engage, initiator: orc, target: kara }
  - { action: toggle_role, participant: orc }
";

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// version / completions
// ============================================================================

#[test]
fn version_human() {
    let output = run_cli(&["version"]);
    assert!(output.status.success(), "version should exit 0: {}", stderr(&output));
    assert!(stdout(&output).starts_with("phasekeeper "));
}

#[test]
fn version_json() {
    let output = run_cli(&["version", "--format", "json"]);
    assert!(output.status.success());
    let parsed: Value = serde_json::from_str(&stdout(&output)).expect("version JSON should be valid");
    assert_eq!(parsed["name"], "phasekeeper");
    assert!(parsed.get("version").is_some());
}

#[test]
fn completions_bash() {
    let output = run_cli(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("phasekeeper"));
}

// ============================================================================
// show
// ============================================================================

#[test]
fn show_prints_grouping() {
    let dir = tempfile::tempdir().unwrap();
    let encounter = write_file(dir.path(), "bridge.yaml", ENCOUNTER);

    let output = run_cli(&["show", "--encounter", &encounter]);
    assert!(output.status.success(), "show failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("bridge (round 1)"));
    assert!(text.contains("ranged (1)"));
    assert!(text.contains("none (2)"));
}

#[test]
fn show_missing_file_is_io_error() {
    let output = run_cli(&["show", "--encounter", "/definitely/not/here.yaml"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).starts_with("error: "));
}

// ============================================================================
// apply
// ============================================================================

#[test]
fn apply_writes_updated_encounter() {
    let dir = tempfile::tempdir().unwrap();
    let encounter = write_file(dir.path(), "bridge.yaml", ENCOUNTER);
    let script = write_file(dir.path(), "script.yaml", SCRIPT);
    let out = dir.path().join("after.json");
    let events = dir.path().join("events.jsonl");

    let output = run_cli(&[
        "apply",
        "--encounter",
        &encounter,
        "--script",
        &script,
        "--output",
        out.to_str().unwrap(),
        "--events-file",
        events.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "apply failed: {}", stderr(&output));

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let kara = &saved["participants"][0]["flags"];
    let orc = &saved["participants"][1]["flags"];
    assert_eq!(kara["phase"], "melee");
    assert_eq!(orc["phase"], "melee");
    // kara rolled higher and attacked first; the toggle swapped both roles
    assert_eq!(kara["meleeRole"], "defender");
    assert_eq!(orc["meleeRole"], "attacker");
    assert_eq!(kara["engagementGroupId"], orc["engagementGroupId"]);
    assert_eq!(kara["reactionRollResult"], 14);
    assert_eq!(saved["participants"][2]["flags"]["order"], 1000);

    let journal = std::fs::read_to_string(&events).unwrap();
    let kinds: Vec<String> = journal
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, ["PhaseAssigned", "PhaseAssigned", "GroupFormed", "RoleToggled"]);
}

#[test]
fn apply_without_output_prints_json_grouping() {
    let dir = tempfile::tempdir().unwrap();
    let encounter = write_file(dir.path(), "bridge.yaml", ENCOUNTER);
    let script = write_file(dir.path(), "script.yaml", SCRIPT);

    let output = run_cli(&[
        "apply", "-e", &encounter, "-s", &script, "--format", "json",
    ]);
    assert!(output.status.success(), "apply failed: {}", stderr(&output));

    let view: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(view["phases"]["melee"].as_array().unwrap().len(), 2);
    assert_eq!(view["engagements"].as_array().unwrap().len(), 1);
}

#[test]
fn apply_reports_failing_action() {
    let dir = tempfile::tempdir().unwrap();
    let encounter = write_file(dir.path(), "bridge.yaml", ENCOUNTER);
    let script = write_file(
        dir.path(),
        "bad.yaml",
        "actions:\n  - { action: assign, participant: kara, phase: melee }\n  - { action: engage, initiator: kara, target: archer }\n",
    );
    let out = dir.path().join("after.yaml");

    let output = run_cli(&[
        "apply",
        "-e",
        &encounter,
        "-s",
        &script,
        "-o",
        out.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("action #1 (engage)"));
    assert!(!out.exists());
}

#[test]
fn apply_unknown_phase_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let encounter = write_file(dir.path(), "bridge.yaml", ENCOUNTER);
    let script = write_file(
        dir.path(),
        "typo.yaml",
        "actions:\n  - { action: assign, participant: kara, phase: mystc }\n",
    );

    let output = run_cli(&["apply", "-e", &encounter, "-s", &script]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("did you mean 'mystic'"));
}

#[test]
fn apply_invalid_config_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let encounter = write_file(dir.path(), "bridge.yaml", ENCOUNTER);
    let script = write_file(dir.path(), "script.yaml", SCRIPT);
    let config = write_file(dir.path(), "config.yaml", "ordering:\n  tail_gap: 0\n");

    let output = run_cli(&["apply", "-e", &encounter, "-s", &script, "-c", &config]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("ordering.tail_gap"));
}

#[test]
fn apply_prints_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let encounter = write_file(dir.path(), "bridge.yaml", ENCOUNTER);
    let script = write_file(dir.path(), "script.yaml", SCRIPT);

    let output = run_cli(&["apply", "-e", &encounter, "-s", &script, "--metrics"]);
    assert!(output.status.success(), "apply failed: {}", stderr(&output));
    assert!(stdout(&output).contains("phasekeeper_operations_total"));
}
