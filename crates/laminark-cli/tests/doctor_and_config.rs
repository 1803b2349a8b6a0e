use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn doctor_reports_the_latest_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("laminark")
        .unwrap()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema version"));
}

#[test]
fn config_show_prints_the_default_processor_interval() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("laminark")
        .unwrap()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("2000"));
}

#[test]
fn config_show_honors_a_config_file_override() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), r#"{"processor": {"batchSize": 7}}"#).unwrap();

    Command::cargo_bin("laminark")
        .unwrap()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"batchSize\": 7"));
}
