use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn scorecard(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("scorecard").unwrap();
    cmd.current_dir(dir)
        .env_remove("SCORECARD_DB")
        .env_remove("SCORECARD_ANSWERER_ENDPOINT")
        .env_remove("SCORECARD_CASE_TIMEOUT_SECONDS")
        .env("SCORECARD_LOG", "warn")
        .arg("--config")
        .arg(dir.join("scorecard.yaml"))
        .arg("--db")
        .arg(dir.join("data/scorecard.db"));
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

fn write_config(dir: &Path, answerer: &str) {
    fs::write(
        dir.join("scorecard.yaml"),
        format!(
            r#"
version: 1
run:
  case_timeout_seconds: 5
answerer:
{answerer}
scorer:
  kind: exact
"#
        ),
    )
    .unwrap();
}

const CASES: &str = "id,input,expected,topic\n1,hello,hello,greeting\n2,2+2?,4,math\n";

#[test]
fn init_writes_config_once() {
    let dir = TempDir::new().unwrap();
    scorecard(dir.path())
        .arg("init")
        .assert()
        .success()
        .stderr(contains("created"));
    let cfg = fs::read_to_string(dir.path().join("scorecard.yaml")).unwrap();
    assert!(cfg.contains("version: 1"));

    scorecard(dir.path())
        .arg("init")
        .assert()
        .success()
        .stderr(contains("already exists"));
}

#[test]
fn upload_then_browse() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("greetings.csv"), CASES).unwrap();

    let uploaded = stdout_json(
        scorecard(dir.path())
            .arg("upload")
            .arg("greetings.csv")
            .arg("--project")
            .arg("demo"),
    );
    assert_eq!(uploaded["test_case_count"], 2);
    assert_eq!(uploaded["name"], "greetings.csv");
    let set_id = uploaded["test_set_id"].as_i64().unwrap();

    let sets = stdout_json(scorecard(dir.path()).args(["sets", "--keywords", "greet"]));
    assert_eq!(sets.as_array().unwrap().len(), 1);

    let detail = stdout_json(scorecard(dir.path()).args(["show", &set_id.to_string()]));
    assert_eq!(detail["project"], "demo");
    assert_eq!(detail["cases"][1]["expected"], "4");
}

#[test]
fn invalid_upload_exits_with_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.csv"), "id,input,expected\n1,hi,\n").unwrap();

    scorecard(dir.path())
        .args(["upload", "bad.csv"])
        .assert()
        .code(2)
        .stderr(contains("row 1: missing expected"));

    scorecard(dir.path())
        .args(["show", "1"])
        .assert()
        .code(2)
        .stderr(contains("not found"));
}

#[test]
fn echo_run_scores_and_downloads_csv() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "  kind: echo");
    fs::write(dir.path().join("greetings.csv"), CASES).unwrap();

    let uploaded = stdout_json(scorecard(dir.path()).args(["upload", "greetings.csv"]));
    let set_id = uploaded["test_set_id"].as_i64().unwrap().to_string();

    let summary = stdout_json(scorecard(dir.path()).args(["run", &set_id]));
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["success_count"], 2);
    assert_eq!(summary["failed_count"], 0);
    let run_id = summary["test_run_id"].as_i64().unwrap().to_string();

    let rows = stdout_json(scorecard(dir.path()).args(["rows", &run_id]));
    assert_eq!(rows[0]["score"], "1");
    assert_eq!(rows[1]["actual"], "2+2?");
    assert_eq!(rows[1]["score"], "0");

    let runs = stdout_json(scorecard(dir.path()).args(["runs", &set_id]));
    assert_eq!(runs.as_array().unwrap().len(), 1);

    let run = stdout_json(scorecard(dir.path()).args(["run-info", &run_id]));
    assert_eq!(run["status"], "completed");
    assert!(run["completed_at"].is_string());

    let out = dir.path().join("exports/results.csv");
    scorecard(dir.path())
        .args(["download", &run_id, "--format", "csv", "--out"])
        .arg(&out)
        .assert()
        .success();
    let csv = fs::read_to_string(&out).unwrap();
    assert!(
        csv.starts_with("id,input,expected,actual,score,reasoning,topic"),
        "{csv}"
    );
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn unreachable_answerer_fails_cases_not_the_run() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "  kind: http\n  endpoint: http://127.0.0.1:9/answer",
    );
    fs::write(dir.path().join("greetings.csv"), CASES).unwrap();

    let uploaded = stdout_json(scorecard(dir.path()).args(["upload", "greetings.csv"]));
    let set_id = uploaded["test_set_id"].as_i64().unwrap().to_string();

    let out = scorecard(dir.path())
        .args(["run", &set_id])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let summary: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["failed_count"], 2);

    let run_id = summary["test_run_id"].as_i64().unwrap().to_string();
    let rows = stdout_json(scorecard(dir.path()).args(["rows", &run_id]));
    assert!(rows[0]["reasoning"]
        .as_str()
        .unwrap()
        .starts_with("ERROR: "));
}

#[test]
fn run_of_unknown_set_is_not_found() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "  kind: echo");
    scorecard(dir.path())
        .args(["run", "99"])
        .assert()
        .code(2)
        .stderr(contains("test set not found: 99"));
}

#[test]
fn config_warnings_reach_stderr() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "  kind: echo\nbogus_key: 1");

    scorecard(dir.path())
        .arg("sets")
        .assert()
        .success()
        .stdout(contains("[]"))
        .stderr(contains("bogus_key"));

    scorecard(dir.path())
        .env("SCORECARD_CASE_TIMEOUT_SECONDS", "abc")
        .arg("sets")
        .assert()
        .success()
        .stderr(contains("SCORECARD_CASE_TIMEOUT_SECONDS"));
}

#[test]
fn http_answerer_without_endpoint_is_rejected_at_load() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "  kind: http\n  endpoint: null");

    scorecard(dir.path())
        .arg("sets")
        .assert()
        .code(2)
        .stderr(contains("requires answerer.endpoint"));
}
