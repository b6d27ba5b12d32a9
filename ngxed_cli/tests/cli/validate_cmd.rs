use std::io::Write;

use predicates::prelude::*;
use tempfile::NamedTempFile;

use crate::fixture;

fn config_file(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file
}

#[test]
fn test_validate_command_without_config_arg_should_return_error() {
    let mut cmd = assert_cmd::Command::cargo_bin("ngxed").unwrap();
    cmd.arg("validate")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains(
            "the following required arguments were not provided:\n  --config <CONFIG>",
        ));
}

#[test]
fn test_validate_command_should_return_success_for_valid_config() {
    let temp_file = config_file(&fixture());

    let mut cmd = assert_cmd::Command::cargo_bin("ngxed").unwrap();
    cmd.arg("validate")
        .arg("--config")
        .arg(temp_file.path())
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::contains("✅ Specified config is valid."));
}

#[test]
fn test_validate_command_should_report_malformed_directive() {
    let temp_file = config_file(
        "http {\n    server {\n        server_name w;\n        listen 80;\n        location / {\n            proxy_pass not-a-valid-uri;\n        }\n    }\n}\n",
    );

    let mut cmd = assert_cmd::Command::cargo_bin("ngxed").unwrap();
    cmd.arg("validate")
        .arg("-c")
        .arg(temp_file.path())
        .assert()
        .failure()
        .code(65)
        .stderr(predicate::str::contains(
            "error: line 6: malformed `proxy_pass` value 'not-a-valid-uri' in location block",
        ));
}

#[test]
fn test_validate_command_should_report_structure_error() {
    let temp_file = config_file("events {\n}\n");

    let mut cmd = assert_cmd::Command::cargo_bin("ngxed").unwrap();
    cmd.arg("validate")
        .arg("-c")
        .arg(temp_file.path())
        .assert()
        .failure()
        .code(65)
        .stderr(predicate::str::contains("no `http` block found"));
}

#[test]
fn test_validate_command_should_report_missing_file() {
    let mut cmd = assert_cmd::Command::cargo_bin("ngxed").unwrap();
    cmd.arg("validate")
        .arg("-c")
        .arg("path/to/not/exist.conf")
        .assert()
        .failure()
        .code(66)
        .stderr(predicate::str::contains(
            "can't load config from 'path/to/not/exist.conf'",
        ));
}

#[test]
fn test_print_command_reproduces_file() {
    let content = fixture();
    let temp_file = config_file(&content);

    let mut cmd = assert_cmd::Command::cargo_bin("ngxed").unwrap();
    cmd.arg("print")
        .arg("-c")
        .arg(format!("file://{}", temp_file.path().display()))
        .assert()
        .success()
        .stdout(content);
}

#[test]
fn test_list_command() {
    let temp_file = config_file(&fixture());

    let mut cmd = assert_cmd::Command::cargo_bin("ngxed").unwrap();
    cmd.arg("list")
        .arg("-c")
        .arg(temp_file.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "upstream backend (least_conn)\n    localhost:8180\n    localhost:8280\nserver worker:80\n    location / -> http://backend\n",
        ));
}
