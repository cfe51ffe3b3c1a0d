//! CLI integration tests for the strand command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Server configuration commands edit the user config
//! - Invalid inputs are rejected with appropriate messages
//!
//! Every test runs with a throwaway `--config-dir` and working directory so
//! no real configuration is read or written. Nothing here needs a live MCP
//! server.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the strand binary, isolated in `dir`.
fn strand(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("strand").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("STRAND_CONFIG_DIR")
        .arg("--config-dir")
        .arg(dir.path());
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("command-line client for MCP servers over HTTP"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("strand"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("servers"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("call"))
        .stdout(predicate::str::contains("resources"))
        .stdout(predicate::str::contains("prompts"))
        .stdout(predicate::str::contains("request"))
        .stdout(predicate::str::contains("notify"))
        .stdout(predicate::str::contains("connect-all"));
}

#[test]
fn test_call_help_shows_args_flag() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .args(["call", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--args"));
}

#[test]
fn test_missing_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    strand(&dir).assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Servers Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_servers_empty() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .arg("servers")
        .assert()
        .success()
        .stdout(predicate::str::contains("No servers configured."));
}

#[test]
fn test_servers_add_list_remove() {
    let dir = TempDir::new().unwrap();

    strand(&dir)
        .args(["servers", "add", "files", "http://localhost:3000/mcp"])
        .args(["-H", "Authorization=Bearer abc", "--timeout", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added server 'files'"));

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("http://localhost:3000/mcp"));
    assert!(saved.contains("Authorization"));

    strand(&dir)
        .args(["--json", "servers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files\""))
        .stdout(predicate::str::contains("\"enabled\": true"));

    strand(&dir)
        .args(["servers", "remove", "files"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed server 'files'"));

    strand(&dir)
        .arg("servers")
        .assert()
        .success()
        .stdout(predicate::str::contains("No servers configured."));
}

#[test]
fn test_servers_add_duplicate_rejected() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .args(["servers", "add", "files", "http://localhost:3000/mcp"])
        .assert()
        .success();
    strand(&dir)
        .args(["servers", "add", "files", "http://localhost:4000/mcp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_servers_add_rejects_non_http_url() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .args(["servers", "add", "files", "ftp://localhost/mcp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an http(s) URL"));
}

#[test]
fn test_servers_add_rejects_bad_header() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .args(["servers", "add", "files", "http://localhost:3000/mcp"])
        .args(["-H", "no-equals-sign"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_servers_remove_unknown() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .args(["servers", "remove", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_tools_unknown_server() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .args(["tools", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in config"));
}

#[test]
fn test_call_rejects_invalid_json_args() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .args(["call", "http://127.0.0.1:1/mcp", "echo", "--args", "{nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--args must be valid JSON"));
}

#[test]
fn test_init_unreachable_server() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .args(["init", "http://127.0.0.1:1/mcp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to initialize"));
}

#[test]
fn test_connect_all_without_servers() {
    let dir = TempDir::new().unwrap();
    strand(&dir)
        .arg("connect-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("No enabled servers configured."));
}
