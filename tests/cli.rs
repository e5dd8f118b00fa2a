//! Runs the compiled `trace` binary. Only commands that never reach a
//! provider are exercised here.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn trace(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trace"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn setup_config(body: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("trace.toml");
    fs::write(&path, body).unwrap();
    (tmp, path)
}

#[test]
fn test_providers_table() {
    let (_tmp, config) = setup_config("[http]\napi_timeout_ms = 4000\n");
    let output = trace(&config, &["providers"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("PROVIDER"));
    assert!(stdout.contains("GitHub"));
    assert!(stdout.contains("4000ms"));
    assert!(stdout.contains("Google Vision"));
    assert_eq!(stdout.lines().count(), 24);
}

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let output = trace(&tmp.path().join("absent.toml"), &["providers"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("6000ms"));
}

#[test]
fn test_invalid_config_is_an_error() {
    let (_tmp, config) = setup_config("[http]\nweb_timeout_ms = 0\n");
    let output = trace(&config, &["providers"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("http.web_timeout_ms"));
}

#[test]
fn test_invalid_email_prints_report() {
    let (_tmp, config) = setup_config("");
    let output = trace(&config, &["search", "email", "not-an-email"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"valid\": false"));
    assert!(stdout.contains("Invalid email format"));
}

#[test]
fn test_empty_username_fails() {
    let (_tmp, config) = setup_config("");
    let output = trace(&config, &["search", "username", "  "]);
    assert!(!output.status.success());
}

#[test]
fn test_unreadable_image_fails() {
    let (tmp, config) = setup_config("");
    let missing = tmp.path().join("missing.png");
    let output = trace(&config, &["search", "image", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read image"));
}
