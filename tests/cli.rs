use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::{TempDir, tempdir};

use qsim::question::{QuestionRecord, QuestionType};
use qsim::test_utils::fixtures::{scenario_bank, to_jsonl};

fn qsim(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("qsim").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env("HOME", dir)
        .env_remove("QSIM_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_bank(records: &[QuestionRecord]) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bank.jsonl");
    std::fs::write(&path, to_jsonl(records)).unwrap();
    (dir, path)
}

#[test]
fn test_cli_help() {
    let dir = tempdir().unwrap();
    qsim(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("find"));
}

#[test]
fn test_cli_version() {
    let dir = tempdir().unwrap();
    qsim(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_find_robot_outputs_response_envelope() {
    let (dir, bank) = write_bank(&scenario_bank());
    let output = qsim(dir.path())
        .args(["--robot", "--quiet", "find", "--bank"])
        .arg(&bank)
        .args([
            "--stem", "求解方程：4x+1=9", "--answer", "x=2", "--type", "calculation",
            "--difficulty", "2", "--subject", "math", "--top-k", "2", "--threshold", "0.2",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], Value::Bool(true));
    let data = &json["data"];
    assert_eq!(data["total_found"], 2);
    assert_eq!(data["similar_questions"][0]["question"]["id"], "Q1");
    assert_eq!(data["similar_questions"][1]["question"]["id"], "Q2");
    assert_eq!(data["search_statistics"]["total_searches"], 1);
    assert_eq!(data["index_statistics"]["total_questions"], 3);
}

#[test]
fn test_find_from_request_file() {
    let (dir, bank) = write_bank(&scenario_bank());
    let request = dir.path().join("request.json");
    std::fs::write(
        &request,
        r#"{"query_question":{"id":"Q1","stem":"解方程：2x+3=7","correct_answer":"x=2","question_type":"calculation","difficulty_level":2,"subject":"math"},"top_k":5,"similarity_threshold":0.0}"#,
    )
    .unwrap();

    let output = qsim(dir.path())
        .args(["--robot", "--quiet", "find", "--bank"])
        .arg(&bank)
        .arg("--request")
        .arg(&request)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = json["data"]["similar_questions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["question"]["id"].as_str())
        .collect();
    assert_eq!(ids, ["Q2", "Q3"]);
}

#[test]
fn test_find_human_output() {
    let (dir, bank) = write_bank(&scenario_bank());
    qsim(dir.path())
        .args(["--quiet", "find", "--bank"])
        .arg(&bank)
        .args([
            "--stem", "求解方程：4x+1=9", "--answer", "x=2", "--type", "calculation",
            "--difficulty", "2", "--subject", "math",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Q1"))
        .stdout(predicate::str::contains("same subject"));
}

#[test]
fn test_find_invalid_top_k_robot_error() {
    let (dir, bank) = write_bank(&scenario_bank());
    let output = qsim(dir.path())
        .args(["--robot", "--quiet", "find", "--bank"])
        .arg(&bank)
        .args([
            "--stem", "x", "--type", "essay", "--difficulty", "1", "--subject", "math",
            "--top-k", "0",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"]["error"]["code"], "invalid_argument");
}

#[test]
fn test_stats_robot() {
    let (dir, bank) = write_bank(&scenario_bank());
    let output = qsim(dir.path())
        .args(["--robot", "--quiet", "stats", "--bank"])
        .arg(&bank)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["index"]["total_questions"], 3);
    assert_eq!(json["data"]["index"]["by_subject"]["math"], 2);
    assert_eq!(json["data"]["index"]["vector_dimension"], 384);
}

#[test]
fn test_project_config_changes_dimension() {
    let (dir, bank) = write_bank(&scenario_bank());
    std::fs::write(dir.path().join("qsim.toml"), "[vectorizer]\ndims = 64\n").unwrap();

    let output = qsim(dir.path())
        .args(["--robot", "--quiet", "stats", "--bank"])
        .arg(&bank)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["data"]["index"]["vector_dimension"], 64);
}

#[test]
fn test_missing_explicit_config_fails() {
    let (dir, bank) = write_bank(&scenario_bank());
    qsim(dir.path())
        .args(["--quiet", "--config", "nope.toml", "stats", "--bank"])
        .arg(&bank)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing configuration"));
}

#[test]
fn test_validate_reports_bad_records() {
    let mut records = scenario_bank();
    records.push(QuestionRecord::new("BAD", "stem", "", QuestionType::Essay, 7, "chinese"));
    let (dir, bank) = write_bank(&records);

    let output = qsim(dir.path())
        .args(["--robot", "--quiet", "validate", "--bank"])
        .arg(&bank)
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: Value = serde_json::Deserializer::from_str(&stdout)
        .into_iter::<Value>()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(report["data"]["total"], 4);
    assert_eq!(report["data"]["invalid"][0]["id"], "BAD");
    assert_eq!(report["data"]["clean"], false);
}

#[test]
fn test_validate_clean_bank() {
    let (dir, bank) = write_bank(&scenario_bank());
    qsim(dir.path())
        .args(["--quiet", "validate", "--bank"])
        .arg(&bank)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn test_unreadable_bank_fails() {
    let dir = tempdir().unwrap();
    qsim(dir.path())
        .args(["--quiet", "stats", "--bank", "missing.jsonl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import failed"));
}
