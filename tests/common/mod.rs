//! Shared test utilities for integration tests.
//!
//! Add `mod common;` to a test file, then build an origin repository with
//! `OriginFixture` and point a resolver at a temporary cache root.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Returns true when the system `git` can be executed.
///
/// Tests that need real git return early when it is missing.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=Social CR Tests",
            "-c",
            "user.email=tests@social-cr.invalid",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .env("LC_ALL", "C")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A local "remote" laid out as `<tmp>/<host>/<user>/<repo>.git` so that the
/// positional parser sees a host, username and repository name.
pub struct OriginFixture {
    pub temp_dir: TempDir,
    pub remote: String,
}

impl OriginFixture {
    /// Create an origin repository with one commit containing `README.md`.
    pub fn new(host: &str, user: &str, repo: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let origin = temp_dir
            .path()
            .join(host)
            .join(user)
            .join(format!("{}.git", repo));
        std::fs::create_dir_all(&origin).unwrap();

        git(&origin, &["init", "--quiet"]);
        std::fs::write(origin.join("README.md"), "# fixture\n").unwrap();
        git(&origin, &["add", "README.md"]);
        git(&origin, &["commit", "--quiet", "-m", "Initial commit"]);

        let remote = origin.to_string_lossy().into_owned();
        Self { temp_dir, remote }
    }

    pub fn origin_path(&self) -> PathBuf {
        PathBuf::from(&self.remote)
    }
}
