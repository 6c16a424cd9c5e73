use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("ledger.json");

    let mut cmd = Command::new(cargo_bin!("escrowsim"));
    cmd.arg("--store")
        .arg(&store)
        .arg("--db-path")
        .arg(dir.path().join("some_db"))
        .arg("list");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("but 'storage-rocksdb' feature is not enabled. Falling back to JSON file storage."));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let output = Command::new(cargo_bin!("escrowsim"))
        .arg("--db-path")
        .arg(&db_path)
        .args(["--latency-ms", "0", "create", "--amount", "100"])
        .args(["--description", "Steel", "--recipient-id", "7", "--recipient-name", "Forge"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    let id = String::from_utf8_lossy(&output.stdout).trim().to_string();

    Command::new(cargo_bin!("escrowsim"))
        .arg("--db-path")
        .arg(&db_path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{},100,locked,7,Forge", id)))
        .stderr(predicate::str::contains("WARNING").not());
}
