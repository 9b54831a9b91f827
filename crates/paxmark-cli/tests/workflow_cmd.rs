//! End-to-end runs of the binary against a manifest in a temporary folder.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use common::{ManifestBuilder, page_contents};
use predicates::prelude::*;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        ManifestBuilder::new()
            .page()
            .passenger(100.0, "9J-123456", "田中太郎", [2, 1, 0, 3], "成田→東京123便")
            .passenger(130.0, "9J-654321", "山田花子", [1, 1, 1, 3], "成田→東京123便")
            .passenger(160.0, "9J-555555", "別便客", [1, 0, 0, 1], "成田→東京456便")
            .totals(200.0, [3, 2, 1, 6])
            .write(&root.join("保管用_1-15.pdf"));
        fs::write(root.join("flights.txt"), "123号車\n\n456号車\n").unwrap();

        let config = root.join("config.json");
        let json = serde_json::json!({
            "folders": { "output_folder": root },
            "flight_list": root.join("flights.txt"),
            "key_path": root.join("status_key.key"),
        });
        fs::write(&config, json.to_string()).unwrap();
        Self { dir, config }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("paxmark").unwrap();
        cmd.current_dir(self.root()).arg("--config").arg(&self.config);
        cmd
    }

    fn working_copy(&self) -> PathBuf {
        self.root().join("保管用_1-15_marked.pdf")
    }

    fn session_files(&self) -> Vec<PathBuf> {
        let status_dir = self.root().join("status_data");
        let mut files = Vec::new();
        let Ok(days) = fs::read_dir(&status_dir) else {
            return files;
        };
        for day in days {
            for file in fs::read_dir(day.unwrap().path()).unwrap() {
                files.push(file.unwrap().path());
            }
        }
        files
    }
}

#[test]
fn flights_lists_entries_with_labels() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("flights")
        .assert()
        .success()
        .stdout(predicate::str::contains("123号車\t123便"))
        .stdout(predicate::str::contains("456号車\t456便"));
}

#[test]
fn search_prints_rows_of_the_flight() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["search", "123号車"])
        .assert()
        .success()
        .stdout(predicate::str::contains("9J-123456\t田中太郎"))
        .stdout(predicate::str::contains("9J-654321\t山田花子"))
        .stdout(predicate::str::contains("9J-555555").not());
}

#[test]
fn search_json_output() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args(["search", "123号車", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["flight"], "123便");
    let rows = value["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["resv"], "9J-123456");
    assert_eq!(rows[0]["status"], "");
    assert_eq!(rows[0]["page"], 1);
    assert_eq!(value["totals"], serde_json::json!([3, 2, 1, 6]));
}

#[test]
fn unknown_flight_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["search", "999号車"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("999便"));
}

#[test]
fn mark_writes_working_copy_and_session_file() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["mark", "123号車", "9J-123456", "--status", "ns"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NS\t9J-123456"))
        .stdout(predicate::str::contains("passengers marked: 1"));

    assert!(ws.working_copy().exists());
    assert!(page_contents(&ws.working_copy())[0].contains("(NS)"));
    let files = ws.session_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("123便_status.json"));
    assert!(ws.root().join("status_key.key").exists());

    let output = ws
        .cmd()
        .args(["search", "123号車", "--format", "json"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["rows"][0]["status"], "NS");
    assert_eq!(value["totals"], serde_json::json!([1, 1, 1, 3]));
}

#[test]
fn dry_run_writes_nothing() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["mark", "123号車", "9J-654321", "--status", "cxl", "--male", "1", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CXL\t9J-654321"));
    assert!(!ws.working_copy().exists());
    assert!(ws.session_files().is_empty());
}

#[test]
fn mark_unknown_reservation_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["mark", "123号車", "9J-000000", "--status", "ns"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("9J-000000"));
    assert!(!ws.working_copy().exists());
}

#[test]
fn unset_clears_a_committed_status() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["mark", "123号車", "9J-123456", "--status", "ns"])
        .assert()
        .success();
    ws.cmd()
        .args(["unset", "123号車", "9J-123456"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared: 1"))
        .stdout(predicate::str::contains("pages reset: 1"));
    assert!(!page_contents(&ws.working_copy())[0].contains("(NS)"));
}

#[test]
fn unset_without_status_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["unset", "123号車", "9J-123456"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("9J-123456"));
}

#[test]
fn commit_rebuild_redraws_flight_marks() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["mark", "123号車", "9J-123456", "--status", "ns"])
        .assert()
        .success();
    ws.cmd()
        .args(["commit", "123号車", "--rebuild"])
        .assert()
        .success()
        .stdout(predicate::str::contains("passengers marked: 1"));
    assert_eq!(page_contents(&ws.working_copy())[0].matches("(NS)").count(), 1);
}
