//! Tests of the `feedcrawl` binary that need no network.
//!
//! Crawls point the config at a closed local port, so every request fails
//! immediately.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn feedcrawl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("feedcrawl").unwrap();
    cmd.current_dir(dir.path())
        .env("FEEDCRAWL_CONFIG_PATH", dir.path().join("absent.toml"))
        .env("FEEDCRAWL_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn offline_config(dir: &TempDir) -> String {
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "base_url = \"http://127.0.0.1:9\"\nrequest_timeout_secs = 2\n",
    )
    .unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    feedcrawl(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("crawl"))
        .stdout(predicate::str::contains("pinned"));
}

#[test]
fn test_crawl_requires_roots() {
    let dir = TempDir::new().unwrap();
    feedcrawl(&dir).arg("crawl").assert().failure();
}

#[test]
fn test_invalid_identifier_is_rejected() {
    let dir = TempDir::new().unwrap();
    feedcrawl(&dir)
        .args(["crawl", "-f", "numpy-feedstock,bad/name"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid package identifier 'bad/name'"));
}

#[test]
fn test_unsupported_arch_is_rejected() {
    let dir = TempDir::new().unwrap();
    feedcrawl(&dir)
        .args(["crawl", "-f", "numpy", "-a", "linux-64 sparc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sparc arch is not supported"));
}

#[test]
fn test_missing_explicit_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    feedcrawl(&dir)
        .args(["--config", "nope.toml", "crawl", "-f", "numpy"])
        .assert()
        .code(1);
}

#[test]
fn test_malformed_manifest_is_fatal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("manifest.yaml"), "other: []\n").unwrap();
    feedcrawl(&dir)
        .args(["crawl", "-m", "manifest.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("manifest"));
}

#[test]
fn test_unreachable_root_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(&dir);
    feedcrawl(&dir)
        .args(["--config", &config, "crawl", "-f", "zlib-feedstock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Feedstocks that could not be located:"))
        .stdout(predicate::str::contains("- zlib-feedstock"));
}

#[test]
fn test_pinned_without_network_prints_empty_order() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(&dir);
    std::fs::write(dir.path().join("manifest.yaml"), "feedstocks:\n  - libxml2-feedstock\n").unwrap();
    std::fs::write(dir.path().join("cbc.yaml"), "libxml2:\n  - 2.12\n").unwrap();
    feedcrawl(&dir)
        .args(["--config", &config, "pinned", "-m", "manifest.yaml", "--pinned", "cbc.yaml"])
        .assert()
        .success()
        .stdout("\n");
}
