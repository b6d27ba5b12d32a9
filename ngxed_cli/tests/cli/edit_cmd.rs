use std::fs;

use claims::assert_ok;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::fixture;

/// A scratch directory holding a copy of the fixture.
fn workspace() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nginx.conf");
    fs::write(&path, fixture()).unwrap();
    let path = path.to_str().unwrap().to_string();
    (dir, path)
}

fn ngxed(args: &[&str]) -> assert_cmd::assert::Assert {
    assert_cmd::Command::cargo_bin("ngxed")
        .unwrap()
        .args(args)
        .assert()
}

#[test]
fn test_add_upstream_server_writes_back_in_place() {
    let (_dir, path) = workspace();

    ngxed(&[
        "add-upstream-server",
        "-c",
        &path,
        "--upstream",
        "backend",
        "--server",
        "localhost:8380",
    ])
    .success()
    .stdout("");

    let expected = fixture().replace(
        "        server localhost:8280;\n",
        "        server localhost:8280;\n        server localhost:8380;\n",
    );
    assert_eq!(assert_ok!(fs::read_to_string(&path)), expected);
}

#[test]
fn test_dry_run_prints_and_leaves_file_untouched() {
    let (_dir, path) = workspace();
    let expected = fixture().replace("        listen 80;\n        location / {\n            proxy_pass http://localhost:8280/;", "        listen 8080;\n        location / {\n            proxy_pass http://localhost:8280/;");

    ngxed(&[
        "set-listen",
        "-c",
        &path,
        "--server",
        "worker02",
        "--listen",
        "8080",
        "--dry-run",
    ])
    .success()
    .stdout(expected);

    assert_eq!(fs::read_to_string(&path).unwrap(), fixture());
}

#[test]
fn test_output_goes_to_separate_file() {
    let (dir, path) = workspace();
    let output = dir.path().join("out.conf");

    ngxed(&[
        "remove-server",
        "-c",
        &path,
        "--name",
        "worker01",
        "-o",
        output.to_str().unwrap(),
    ])
    .success();

    let written = fs::read_to_string(&output).unwrap();
    assert!(!written.contains("server_name worker01;"));
    assert!(written.contains("server_name worker02;"));
    assert_eq!(fs::read_to_string(&path).unwrap(), fixture());
}

#[test]
fn test_add_server_with_location() {
    let (_dir, path) = workspace();

    ngxed(&[
        "add-server",
        "-c",
        &path,
        "--name",
        "worker03",
        "--listen",
        "80",
        "--location",
        "/",
        "--proxy-pass",
        "http://localhost:8380/",
    ])
    .success();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains(
        "    server {\n        server_name worker03;\n        listen 80;\n        location / {\n            proxy_pass http://localhost:8380/;\n        }\n    }\n    # trailing http comment\n"
    ));
}

#[test]
fn test_unknown_upstream_is_not_found() {
    let (_dir, path) = workspace();

    ngxed(&[
        "set-method",
        "-c",
        &path,
        "--upstream",
        "nope",
        "--method",
        "ip_hash",
    ])
    .failure()
    .code(1)
    .stderr(predicate::str::contains("error: upstream 'nope' not found"));

    assert_eq!(fs::read_to_string(&path).unwrap(), fixture());
}

#[test]
fn test_duplicate_location_already_exists() {
    let (_dir, path) = workspace();

    ngxed(&[
        "add-location",
        "-c",
        &path,
        "--server",
        "worker",
        "--path",
        "/foo",
    ])
    .failure()
    .code(1)
    .stderr(predicate::str::contains("location '/foo' already exists"));
}

#[test]
fn test_set_proxy_pass_and_clear_method() {
    let (_dir, path) = workspace();

    ngxed(&[
        "set-proxy-pass",
        "-c",
        &path,
        "--server",
        "worker",
        "--path",
        "/foo",
        "--proxy-pass",
        "http://backend/bar",
    ])
    .success();
    ngxed(&["set-method", "-c", &path, "--upstream", "backend"]).success();

    let expected = fixture()
        .replace("proxy_pass http://backend/foo;", "proxy_pass http://backend/bar;")
        .replace("        least_conn;\n\n", "");
    assert_eq!(fs::read_to_string(&path).unwrap(), expected);
}
