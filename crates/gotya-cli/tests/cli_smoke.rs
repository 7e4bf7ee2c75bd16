//! End-to-end smoke tests against the built `gotya` binary: each test
//! spawns the real executable in a throwaway `GOTYA_HOME` so commands
//! that touch the state database or config file can't collide with a
//! developer's real `~/.gotya`.

use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

struct TestContext {
    _temp_dir: TempDir,
    gotya_home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let gotya_home = temp_dir.path().join(".gotya");
        std::fs::create_dir_all(&gotya_home).expect("failed to create gotya home");
        Self { _temp_dir: temp_dir, gotya_home }
    }

    fn gotya_cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_gotya"));
        cmd.env("GOTYA_HOME", &self.gotya_home);
        cmd
    }
}

#[test]
fn help_lists_subcommands() {
    let ctx = TestContext::new();
    let output = ctx.gotya_cmd().arg("--help").output().expect("failed to run gotya");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("install"));
    assert!(stdout.contains("uninstall"));
}

#[test]
fn version_flag_succeeds() {
    let ctx = TestContext::new();
    let output = ctx.gotya_cmd().arg("--version").output().expect("failed to run gotya");
    assert!(output.status.success());
}

#[test]
fn list_on_empty_home_reports_nothing_installed() {
    let ctx = TestContext::new();
    let output = ctx.gotya_cmd().arg("list").output().expect("failed to run gotya");
    assert!(output.status.success());
    assert!(ctx.gotya_home.join("state.db").exists(), "list should initialize the state db");
}

#[test]
fn install_without_configured_repositories_fails_cleanly() {
    let ctx = TestContext::new();
    let output = ctx
        .gotya_cmd()
        .arg("install")
        .arg("ripgrep")
        .output()
        .expect("failed to run gotya");
    assert!(!output.status.success(), "install with no repositories configured should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.is_empty(), "failure should explain why");
}

#[test]
fn uninstall_unknown_artifact_fails_cleanly() {
    let ctx = TestContext::new();
    let output = ctx
        .gotya_cmd()
        .arg("uninstall")
        .arg("not-installed")
        .output()
        .expect("failed to run gotya");
    assert!(!output.status.success());
}

#[test]
fn repo_list_on_fresh_home_succeeds() {
    let ctx = TestContext::new();
    let output = ctx.gotya_cmd().arg("repo").arg("list").output().expect("failed to run gotya");
    assert!(output.status.success());
}
