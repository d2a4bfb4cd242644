// Integration tests for the redis-geo binary

use assert_cmd::Command;
use std::net::TcpListener;

#[test]
fn test_missing_command_is_usage_error() {
    let output = Command::cargo_bin("redis-geo").unwrap().output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage: redis-geo"));
}

#[test]
fn test_help() {
    let output = Command::cargo_bin("redis-geo")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("usage: redis-geo"));
}

#[test]
fn test_bad_url() {
    let output = Command::cargo_bin("redis-geo")
        .unwrap()
        .args(["-u", "http://localhost", "PING"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported URL scheme"));
}

#[test]
fn test_connection_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let output = Command::cargo_bin("redis-geo")
        .unwrap()
        .args(["-u", &format!("redis://127.0.0.1:{}", port), "GEOPOS", "Sicily", "Palermo"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("GEOPOS failed"));
}
