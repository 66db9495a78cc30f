//! CLI integration tests.
//!
//! These tests exercise the CLI commands end-to-end. None of them touch the
//! network: probes target stdio entries or endpoints rejected before I/O.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the mcpcat binary isolated from the user's config.
fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mcpcat"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("MCPCAT_PROBE_TIMEOUT_MS")
        .env_remove("MCPCAT_DEBUG")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_version_command() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = run(temp.path(), &["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mcpcat"));
}

#[test]
fn test_help_command() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = run(temp.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("probe"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("--verbose"));
}

#[test]
fn test_probe_stdio_json() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = run(
        temp.path(),
        &["probe", "npx -y @acme/files", "--transport", "stdio", "--json"],
    );

    assert!(output.status.success());
    let outcome: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(outcome["reachable"], true);
    assert_eq!(outcome["serverInfo"]["name"], "STDIO MCP Server");
    assert_eq!(outcome["tools"], serde_json::json!([]));
}

#[test]
fn test_probe_unsupported_scheme_fails() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = run(temp.path(), &["probe", "ftp://example.com/mcp", "--json"]);

    assert!(!output.status.success());
    let outcome: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(outcome["reachable"], false);
    assert!(outcome["error"].is_string());
}

#[test]
fn test_invalid_transport() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = run(temp.path(), &["probe", "https://x/mcp", "--transport", "carrier-pigeon"]);

    assert!(!output.status.success());
}

#[test]
fn test_config_command() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(
        temp.path().join("mcpcat.json"),
        r#"{ "probe": { "maxRedirects": 5 } }"#,
    )
    .expect("Failed to write config");

    let output = run(temp.path(), &["config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration sources"));
    assert!(stdout.contains("mcpcat.json"));
    assert!(stdout.contains("max redirects:    5"));
}

#[test]
fn test_check_writes_catalog() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let catalog = temp.path().join("catalog.json");
    std::fs::write(
        &catalog,
        r#"[
            {
                "id": "srv_files",
                "name": "Files",
                "endpoint": "npx -y @acme/files",
                "type": "stdio",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }
        ]"#,
    )
    .expect("Failed to write catalog");

    let output = run(temp.path(), &["check", "catalog.json", "--json", "--write"]);
    assert!(output.status.success());

    let printed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(printed[0]["status"], "online");

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&catalog).unwrap()).unwrap();
    let entry = &written["servers"][0];
    assert_eq!(entry["id"], "srv_files");
    assert_eq!(entry["status"], "online");
    assert_eq!(entry["serverInfo"]["name"], "STDIO MCP Server");
    assert_ne!(entry["updated_at"], "2024-01-01T00:00:00Z");
}

#[test]
fn test_check_rejects_malformed_catalog() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(temp.path().join("catalog.json"), r#"{ "nope": 1 }"#)
        .expect("Failed to write catalog");

    let output = run(temp.path(), &["check", "catalog.json"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("catalog.json"));
}
