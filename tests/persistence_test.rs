#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn submit(db_path: &Path, input: &str) -> std::process::Output {
    Command::new(cargo_bin!("submission-engine"))
        .arg("submit")
        .arg("--file-type")
        .arg("UK.LBG.O.FPS.Batch.v10")
        .arg("--content-type")
        .arg("text/plain")
        .arg("--consent-id")
        .arg("PFC_1")
        .arg("--client-id")
        .arg("client-1")
        .arg("--idempotency-key")
        .arg("key-1")
        .arg("--db-path")
        .arg(db_path)
        .arg(input)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_rocksdb_replay_across_runs() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("submissions_db");

    // 1. First run creates the submission
    let first = submit(&db_path, "tests/fixtures/fps_batch.txt");
    assert!(first.status.success());
    let created = String::from_utf8_lossy(&first.stdout).to_string();
    assert!(created.contains("\"id\":\"PFC_1\""));

    // 2. Second run replays the stored record
    let second = submit(&db_path, "tests/fixtures/fps_batch.txt");
    assert!(second.status.success());
    assert_eq!(String::from_utf8_lossy(&second.stdout), created);

    // 3. A different body under the same key is still a conflict
    let third = submit(&db_path, "tests/fixtures/fps_batch_changed.txt");
    assert!(third.status.success());
    assert!(third.stdout.is_empty());
    assert!(String::from_utf8_lossy(&third.stderr).contains("different request body"));
}
