use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn stepflow(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stepflow").unwrap();
    cmd.current_dir(project)
        .env_remove("RUST_LOG")
        .env_remove("STEPFLOW_STOP_ON_FAILURE")
        .env_remove("STEPFLOW_MAX_SUBSTITUTION_PASSES")
        .env_remove("STEPFLOW_OUTPUT_DIR");
    cmd
}

fn write(project: &Path, name: &str, body: &str) {
    fs::write(project.join(name), body).unwrap();
}

const PASSING_STEPS: &str = r#"
- type: SET
  call:
    patch:
      greeting: "hello {{ user.name }}"
- name: greeting rendered
  call:
    actual: "{{ greeting }}"
    expected: hello ann
- call:
    op: ge
    actual: "{{ user.score | float | round:0 }}"
    expected: 4
"#;

const FAILING_STEPS: &str = r#"
- name: first
  call: {actual: 1, expected: 1}
- name: second
  call: {actual: 1, expected: 2}
- name: third
  call: {actual: "{{ missing }}", expected: 1}
"#;

#[test]
fn test_run_succeeds_and_writes_report() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "steps.yaml", PASSING_STEPS);
    write(temp.path(), "data.yaml", "user:\n  name: ann\n  score: 3.7\n");

    stepflow(temp.path())
        .args(["run", "steps.yaml", "--data", "data.yaml", "--output-dir", "out", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 of 3 steps run, 0 failed"));

    let report: Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("out/report.json")).unwrap())
            .unwrap();
    assert_eq!(report["error_count"], 0);
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 3);
    assert_eq!(report["outcomes"][1]["name"], "greeting rendered");
    assert_eq!(report["outcomes"][1]["status"], "done");
    assert!(temp.path().join("out/stepflow.log").exists());
}

#[test]
fn test_failed_steps_exit_with_one() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "steps.yaml", FAILING_STEPS);

    stepflow(temp.path())
        .args(["run", "steps.yaml", "--output-dir", "out", "--quiet"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("3 of 3 steps run, 2 failed"))
        .stdout(predicate::str::contains("FAILED step #2 ASSERT (third) at SUBSTITUTED_1"));

    let report: Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("out/report.json")).unwrap())
            .unwrap();
    assert_eq!(report["error_count"], 2);
    assert_eq!(report["outcomes"][1]["failed_phase"], "EXECUTED");
    assert_eq!(report["outcomes"][2]["error_code"], "STEP-VAR-001");
}

#[test]
fn test_stop_on_failure_flag() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "steps.yaml", FAILING_STEPS);

    stepflow(temp.path())
        .args(["run", "steps.yaml", "--stop-on-failure", "--quiet"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("2 of 3 steps run, 1 failed (aborted)"));
}

#[test]
fn test_config_file_enables_stop_on_failure() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "steps.yaml", FAILING_STEPS);
    write(temp.path(), "stepflow.toml", "[run]\nstop_on_failure = true\n");

    stepflow(temp.path())
        .args(["run", "steps.yaml", "--quiet"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("(aborted)"));
}

#[test]
fn test_flag_disables_stop_on_failure_from_config_and_env() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "steps.yaml", FAILING_STEPS);
    write(temp.path(), "stepflow.toml", "[run]\nstop_on_failure = true\n");

    stepflow(temp.path())
        .env("STEPFLOW_STOP_ON_FAILURE", "true")
        .args(["run", "steps.yaml", "--no-stop-on-failure", "--quiet"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("3 of 3 steps run, 2 failed"));
}

#[test]
fn test_last_stop_on_failure_flag_wins() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "steps.yaml", FAILING_STEPS);

    stepflow(temp.path())
        .args([
            "run",
            "steps.yaml",
            "--no-stop-on-failure",
            "--stop-on-failure",
            "--quiet",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("(aborted)"));
}

#[test]
fn test_pre_run_errors_exit_with_two() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "mapping.yaml", "type: LOG\n");

    stepflow(temp.path())
        .args(["run", "absent.yaml", "--quiet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("STEP-INPUT-001"));

    stepflow(temp.path())
        .args(["run", "mapping.yaml", "--quiet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("STEP-INPUT-003"));

    stepflow(temp.path())
        .args(["run", "mapping.yaml", "--max-substitution-passes", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("STEP-CONFIG-003"));
}

#[test]
fn test_project_root_is_exposed_to_steps() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("project");
    fs::create_dir_all(&project).unwrap();
    let root = project.display().to_string();
    write(
        temp.path(),
        "steps.yaml",
        &format!(
            "- call:\n    actual: \"{{{{ project_root }}}}\"\n    expected: \"{}\"\n",
            root
        ),
    );

    stepflow(temp.path())
        .args(["run", "steps.yaml", "--quiet", "--project-root"])
        .arg(&project)
        .assert()
        .success();
}

#[test]
fn test_validate_reports_unknown_plugins() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "good.yaml", "- type: log\n  call: {message: hi}\n- call: {actual: 1, expected: 1}\n");
    write(temp.path(), "bad.yaml", "- type: LOG\n- type: http_call\n");

    stepflow(temp.path())
        .args(["validate", "good.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 steps OK"));

    stepflow(temp.path())
        .args(["validate", "bad.yaml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("step #1 (http_call)"))
        .stdout(predicate::str::contains("STEP-PLUGIN-001"));
}

#[test]
fn test_plugins_lists_builtins() {
    let temp = TempDir::new().unwrap();

    stepflow(temp.path())
        .arg("plugins")
        .assert()
        .success()
        .stdout(predicate::str::contains("ASSERT\nSET\nLOG\nCOMMAND\nNOOP"));

    stepflow(temp.path())
        .args(["plugins", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"["ASSERT","SET","LOG","COMMAND","NOOP"]"#,
        ));
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    stepflow(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("plugins"));
}
