//! End-to-end runs of the `pledge` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn pledge(dir: &Path, actor: &str) -> Command {
    let mut cmd = Command::cargo_bin("pledge").unwrap();
    cmd.current_dir(dir)
        .env("PLEDGE_ACTOR", actor)
        .env_remove("PLEDGE_TOKEN")
        .env_remove("PLEDGE_LOG");
    cmd
}

fn json(dir: &Path, actor: &str, args: &[&str]) -> Value {
    let output = pledge(dir, actor)
        .args(["-o", "json"])
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).unwrap()
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[test]
fn init_writes_workspace_and_gitignore() {
    let dir = tempfile::tempdir().unwrap();
    pledge(dir.path(), "alice")
        .args(["init", "--name", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized workspace 'acme'"));

    assert!(dir.path().join(".pledge/config.yaml").exists());
    let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
    assert!(gitignore.contains(".pledge/"));

    pledge(dir.path(), "alice")
        .args(["-o", "json", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E_WORKSPACE_EXISTS"));
}

#[test]
fn commitment_lifecycle_through_the_cli() {
    let dir = tempfile::tempdir().unwrap();
    pledge(dir.path(), "alice").arg("init").assert().success();

    let mem = id(&json(dir.path(), "alice", &["capture", "checkout times out", "--kind", "bug"]));
    let cmt = id(&json(
        dir.path(),
        "alice",
        &["commit", "Fix checkout timeout", "--source", &mem, "--tag", "payments"],
    ));

    json(dir.path(), "alice", &["claim", &cmt]);
    pledge(dir.path(), "bob")
        .args(["-o", "json", "claim", &cmt])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E_ALREADY_CLAIMED"));

    json(dir.path(), "alice", &["submit", &cmt, "--evidence", "PR #12", "--tier", "low"]);
    let queue = json(dir.path(), "bob", &["review-queue"]);
    assert_eq!(queue[0]["id"], cmt.as_str());
    assert_eq!(queue[0]["submitter"], "alice");

    json(dir.path(), "bob", &["approve", &cmt, "--comment", "lgtm"]);
    let shown = json(dir.path(), "bob", &["show", &cmt]);
    assert_eq!(shown["state"], "closed");
    assert_eq!(shown["closed_by"], "bob");

    let listed = json(dir.path(), "bob", &["list", "--tag", "payments"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let log = json(dir.path(), "bob", &["log", "-n", "2"]);
    let ops: Vec<_> = log.as_array().unwrap().iter().map(|o| o["op"].clone()).collect();
    assert_eq!(ops, vec!["submit", "approve"]);
}

#[test]
fn commands_find_the_workspace_from_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    pledge(dir.path(), "alice").arg("init").assert().success();
    let nested = dir.path().join("src/deep");
    std::fs::create_dir_all(&nested).unwrap();

    json(&nested, "alice", &["capture", "noted from below"]);
    let memories = json(dir.path(), "alice", &["list", "--memories"]);
    assert_eq!(memories[0]["state"], "untriaged");
}

#[test]
fn errors_carry_stable_codes() {
    let dir = tempfile::tempdir().unwrap();
    pledge(dir.path(), "alice")
        .args(["-o", "json", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\": \"E_NO_WORKSPACE\""));

    pledge(dir.path(), "alice").arg("init").assert().success();
    pledge(dir.path(), "alice")
        .args(["claim", "cmt_00000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[E_REF_NOT_FOUND]"));

    pledge(dir.path(), "alice")
        .args(["-o", "json", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E_SYNC_NOT_CONFIGURED"));
}

#[test]
fn one_external_reference_per_system() {
    let dir = tempfile::tempdir().unwrap();
    pledge(dir.path(), "alice").arg("init").assert().success();
    let mem = id(&json(dir.path(), "alice", &["capture", "flaky test"]));
    let cmt = id(&json(dir.path(), "alice", &["commit", "Stabilize test", "--source", &mem]));

    let link = [
        "link-external", cmt.as_str(), "--system", "github", "--type", "issue", "--id", "42",
        "--url", "https://github.com/acme/app/issues/42",
    ];
    json(dir.path(), "alice", &link);
    pledge(dir.path(), "alice")
        .args(["-o", "json"])
        .args(link)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E_EXTERNAL_REF_EXISTS"));

    let refs = json(dir.path(), "alice", &["refs", &cmt]);
    assert_eq!(refs[0]["id"], "42");
}
