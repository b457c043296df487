//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let remote = RemoteRepo::new();
//! remote.commit_file("site/index.xml", "<page/>", "Add index page");
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use assert_fs::TempDir;

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::{git, site_yaml, RemoteRepo};
}

/// Run git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=Deployer Tests",
            "-c",
            "user.email=tests@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A bare repository standing in for the remote, plus a seed working copy
/// used to push commits to it.
///
/// Both live in one temporary directory, next to free space for the
/// deployer's own working copies.
#[allow(dead_code)]
pub struct RemoteRepo {
    pub temp: TempDir,
    pub bare: PathBuf,
    pub seed: PathBuf,
}

#[allow(dead_code)]
impl RemoteRepo {
    /// A remote whose `main` branch holds one initial commit.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let bare = temp.path().join("remote.git");
        let seed = temp.path().join("seed");
        std::fs::create_dir_all(&bare).unwrap();
        std::fs::create_dir_all(&seed).unwrap();

        git(&bare, &["init", "--bare", "--quiet"]);
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        git(&seed, &["init", "--quiet"]);
        git(&seed, &["checkout", "--quiet", "-b", "main"]);
        git(&seed, &["remote", "add", "origin", bare.to_str().unwrap()]);

        let repo = Self { temp, bare, seed };
        repo.commit_file("README.md", "# Site content\n", "Initial commit");
        repo
    }

    /// URL to configure as a site's remote.
    pub fn url(&self) -> String {
        self.bare.display().to_string()
    }

    /// A not-yet-existing path for a deployer working copy.
    pub fn working_copy(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    /// Write `content` to `path`, commit it and push.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) {
        let file = self.seed.join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&file, content).unwrap();
        git(&self.seed, &["add", "--all"]);
        self.commit_and_push(message);
    }

    /// Rename `from` to `to`, commit and push.
    pub fn rename_file(&self, from: &str, to: &str, message: &str) {
        if let Some(parent) = self.seed.join(to).parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        git(&self.seed, &["mv", from, to]);
        self.commit_and_push(message);
    }

    /// Delete `path`, commit and push.
    pub fn delete_file(&self, path: &str, message: &str) {
        git(&self.seed, &["rm", "--quiet", path]);
        self.commit_and_push(message);
    }

    fn commit_and_push(&self, message: &str) {
        git(&self.seed, &["commit", "--quiet", "-m", message]);
        git(&self.seed, &["push", "--quiet", "origin", "main"]);
    }
}

/// A site file for `remote` with the given working copy and processors
/// block (already indented as a YAML list).
#[allow(dead_code)]
pub fn site_yaml(remote: &str, working_copy: &Path, processors: &str) -> String {
    let processors = if processors.trim().is_empty() {
        " []\n".to_string()
    } else {
        format!("\n{}", processors)
    };
    format!(
        "localRepositoryRoot: {}\ngitRepositoryUrl: {}\nprocessors:{}",
        working_copy.display(),
        remote,
        processors
    )
}
