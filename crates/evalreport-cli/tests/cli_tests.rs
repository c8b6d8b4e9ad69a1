//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn evalreport() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("evalreport").unwrap()
}

fn write_summary(dir: &Path, name: &str, with_ids: bool) -> PathBuf {
    let mut failing = json!({
        "test_type": "per-instance",
        "description": "no negative logits",
        "passed": false,
        "fail_threshold": 2,
        "fail_number": 3,
    });
    if with_ids {
        failing["fail_id"] = json!(["img_4", "img_17", "img_18"]);
    }
    let summary = json!({
        "title": "Nightly",
        "timestamp": "2025-01-01 00:00:00.000000",
        "execution_time(s)": 12.5,
        "tests": [
            {
                "test_type": "aggregate",
                "description": "accuracy above 0.9",
                "passed": true,
                "inputs": { "acc": 0.93 }
            },
            failing
        ]
    });

    let resources = dir.join("resources");
    std::fs::create_dir_all(&resources).unwrap();
    let path = resources.join(format!("{name}.json"));
    std::fs::write(&path, serde_json::to_string_pretty(&summary).unwrap()).unwrap();
    path
}

#[test]
fn help_lists_commands() {
    evalreport()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("preflight"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn version_flag() {
    evalreport()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn show_prints_results_table() {
    let dir = TempDir::new().unwrap();
    let summary = write_summary(dir.path(), "nightly_test_report", false);

    evalreport()
        .arg("show")
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("accuracy above 0.9"))
        .stdout(predicate::str::contains("per-instance"))
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("2 tests, 1 passed, 1 failed"));
}

#[test]
fn render_without_compiler_writes_source() {
    let dir = TempDir::new().unwrap();
    let empty_bin = TempDir::new().unwrap();
    let summary = write_summary(dir.path(), "nightly_test_report", true);
    let out = dir.path().join("out");

    evalreport()
        .env("PATH", empty_bin.path())
        .arg("render")
        .arg("--summary")
        .arg(&summary)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("source only"))
        .stdout(predicate::str::contains("nightly_test_report.tex"));

    let tex = std::fs::read_to_string(out.join("nightly_test_report.tex")).unwrap();
    assert!(tex.contains(r"\section{Failed Tests}"));
    assert!(tex.contains("Failure data instance ID"));
    assert!(tex.contains(r"img\_17"));
}

#[test]
fn render_defaults_to_report_directory() {
    let dir = TempDir::new().unwrap();
    let empty_bin = TempDir::new().unwrap();
    let summary = write_summary(dir.path(), "Weekly Run", false);

    evalreport()
        .env("PATH", empty_bin.path())
        .arg("render")
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success();

    let tex_path = dir.path().join("weekly_run_test_report.tex");
    let tex = std::fs::read_to_string(tex_path).unwrap();
    assert!(!tex.contains("Failure data instance ID"));
    assert!(!dir.path().join("resources/weekly_run_test_report.tex").exists());
}

#[test]
fn render_missing_summary_fails() {
    let dir = TempDir::new().unwrap();

    evalreport()
        .arg("render")
        .arg("--summary")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn preflight_reports_missing_graph_tool() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("evalreport.toml");
    std::fs::write(
        &config,
        "[preflight]\ngraph_tool = \"evalreport-no-such-graph-tool\"\n",
    )
    .unwrap();

    evalreport()
        .arg("preflight")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("graphviz is not available"))
        .stderr(predicate::str::contains("graphviz.org"));
}

#[test]
fn init_creates_config_once() {
    let dir = TempDir::new().unwrap();

    evalreport()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created evalreport.toml"));
    assert!(dir.path().join("evalreport.toml").exists());

    evalreport()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));
}
