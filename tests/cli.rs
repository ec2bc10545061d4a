use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn convert_csv_to_json_writes_an_array_of_objects() {
    let dir = tempdir().expect("temp dir");
    let csv_path = write_file(&dir, "sample.csv", "id,name,amount\r\n1,Alice,42.5\r\n2,Bob,13.37\r\n");
    let json_path = dir.path().join("sample.json");

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args([
            "convert",
            "-i",
            csv_path.to_str().unwrap(),
            "-o",
            json_path.to_str().unwrap(),
            "--from",
            "csv",
            "--to",
            "json",
            "--dialect",
            "rfc4180",
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&json_path).expect("read json output");
    let value: serde_json::Value = serde_json::from_str(&contents).expect("parse json output");
    let rows = value.as_array().expect("array of records");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Alice");
    assert_eq!(rows[1]["amount"], "13.37");
}

#[test]
fn convert_json_to_csv_round_trips_through_the_same_dialect() {
    let dir = tempdir().expect("temp dir");
    let json_path = write_file(
        &dir,
        "records.json",
        r#"[{"id":"1","name":"Alice"},{"id":"2","name":"Bob"}]"#,
    );
    let csv_path = dir.path().join("records.csv");

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args([
            "convert",
            "-i",
            json_path.to_str().unwrap(),
            "-o",
            csv_path.to_str().unwrap(),
            "--from",
            "json",
            "--to",
            "csv",
            "--dialect",
            "rfc4180",
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&csv_path).expect("read csv output");
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("id,name"));
    assert_eq!(lines.next(), Some("1,Alice"));
    assert_eq!(lines.next(), Some("2,Bob"));
}

#[test]
fn convert_headerless_csv_to_json_uses_an_explicit_header() {
    let dir = tempdir().expect("temp dir");
    let csv_path = write_file(&dir, "headerless.csv", "1,Alice\r\n2,Bob\r\n");
    let json_path = dir.path().join("headerless.json");

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args([
            "convert",
            "-i",
            csv_path.to_str().unwrap(),
            "-o",
            json_path.to_str().unwrap(),
            "--from",
            "csv",
            "--to",
            "json",
            "--dialect",
            "rfc4180",
            "--header",
            "id,name",
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&json_path).expect("read json output");
    let value: serde_json::Value = serde_json::from_str(&contents).expect("parse json output");
    assert_eq!(value[0]["id"], "1");
    assert_eq!(value[1]["name"], "Bob");
}

#[test]
fn convert_ini_to_json_nests_dotted_sections() {
    let dir = tempdir().expect("temp dir");
    let ini_path = write_file(&dir, "app.conf", "[server.http]\nport = 8080\nhost = localhost\n");
    let json_path = dir.path().join("app.json");

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args([
            "convert",
            "-i",
            ini_path.to_str().unwrap(),
            "-o",
            json_path.to_str().unwrap(),
            "--from",
            "ini",
            "--to",
            "json",
            "--dialect",
            "ini-unix",
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&json_path).expect("read json output");
    let value: serde_json::Value = serde_json::from_str(&contents).expect("parse json output");
    assert_eq!(value["server"]["http"]["port"], "8080");
    assert_eq!(value["server"]["http"]["host"], "localhost");
}

#[test]
fn convert_rejects_direct_csv_to_ini() {
    let dir = tempdir().expect("temp dir");
    let csv_path = write_file(&dir, "sample.csv", "a,b\r\n1,2\r\n");

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args([
            "convert",
            "-i",
            csv_path.to_str().unwrap(),
            "--from",
            "csv",
            "--to",
            "ini",
            "--dialect",
            "rfc4180",
        ])
        .assert()
        .failure();
}

#[test]
fn convert_rejects_malformed_csv_with_a_ragged_row() {
    let dir = tempdir().expect("temp dir");
    let csv_path = write_file(&dir, "ragged.csv", "a,b,c\r\n1,2\r\n");

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args([
            "convert",
            "-i",
            csv_path.to_str().unwrap(),
            "--from",
            "csv",
            "--to",
            "json",
            "--dialect",
            "rfc4180",
        ])
        .assert()
        .failure();
}

#[test]
fn dialects_list_includes_every_built_in_preset() {
    Command::cargo_bin("synform")
        .expect("binary exists")
        .args(["dialects", "list"])
        .assert()
        .success()
        .stdout(contains("rfc4180"))
        .stdout(contains("ini-winapi"));
}

#[test]
fn dialects_show_writes_a_yaml_dialect_file_that_validates() {
    let dir = tempdir().expect("temp dir");
    let out_path = dir.path().join("tsv.yaml");

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args(["dialects", "show", "tsv", "-o", out_path.to_str().unwrap()])
        .assert()
        .success();

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args(["dialects", "validate", out_path.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn dialects_validate_rejects_a_malformed_file() {
    let dir = tempdir().expect("temp dir");
    let bad_path = write_file(&dir, "bad.yaml", "format: not-a-real-format\n");

    Command::cargo_bin("synform")
        .expect("binary exists")
        .args(["dialects", "validate", bad_path.to_str().unwrap()])
        .assert()
        .failure();
}
