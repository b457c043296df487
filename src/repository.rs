//! # Repository Client
//!
//! This module defines the interface the sync engine uses to talk to a site's
//! local working copy and its remote. It is modelled as a trait so the engine
//! can be exercised with an in-memory fake in tests, while the application uses
//! `DefaultGitOperations`, which wraps the system `git` command.
//!
//! ## Operations
//!
//! - **clone** a remote into a local directory,
//! - **open** an existing working copy,
//! - **resolve** the current `HEAD`,
//! - **pull** from the remote, classified as a [`PullOutcome`],
//! - **diff** two commits into a list of [`DiffEntry`] values.

use crate::error::Result;
use std::path::Path;

/// The kind of change a diff entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Modify,
    Delete,
    Rename,
}

/// One entry of a tree diff between two commits.
///
/// Paths are relative to the repository root as git reports them, without a
/// leading separator. `old_path` is set for deletes and renames, `new_path`
/// for adds, modifications and renames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub kind: ChangeKind,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
}

impl DiffEntry {
    pub fn added(path: String) -> Self {
        Self {
            kind: ChangeKind::Add,
            old_path: None,
            new_path: Some(path),
        }
    }

    pub fn modified(path: String) -> Self {
        Self {
            kind: ChangeKind::Modify,
            old_path: Some(path.clone()),
            new_path: Some(path),
        }
    }

    pub fn deleted(path: String) -> Self {
        Self {
            kind: ChangeKind::Delete,
            old_path: Some(path),
            new_path: None,
        }
    }

    pub fn renamed(old_path: String, new_path: String) -> Self {
        Self {
            kind: ChangeKind::Rename,
            old_path: Some(old_path),
            new_path: Some(new_path),
        }
    }
}

/// How a pull from the remote ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The local branch moved straight to the remote tip; carries the new head.
    FastForward(String),
    /// Nothing new on the remote.
    UpToDate,
    /// Anything that would need a merge or conflict resolution. The working
    /// copy is left as it was; carries git's explanation.
    Unsupported(String),
}

/// Trait for repository operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Clones `url` into `target_dir`, replacing whatever was there.
    fn clone_repository(&self, url: &str, target_dir: &Path) -> Result<()>;

    /// Checks that `repo` is an existing working copy.
    fn open(&self, repo: &Path) -> Result<()>;

    /// Returns the commit id `HEAD` points at.
    fn resolve_head(&self, repo: &Path) -> Result<String>;

    /// Pulls from the tracked remote without ever merging.
    fn pull(&self, repo: &Path) -> Result<PullOutcome>;

    /// Lists the changes between two commits, with renames detected.
    fn diff(&self, repo: &Path, old_head: &str, new_head: &str) -> Result<Vec<DiffEntry>>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_repository(&self, url: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone_repository(url, target_dir)
    }

    fn open(&self, repo: &Path) -> Result<()> {
        crate::git::open_repository(repo)
    }

    fn resolve_head(&self, repo: &Path) -> Result<String> {
        crate::git::resolve_head(repo)
    }

    fn pull(&self, repo: &Path) -> Result<PullOutcome> {
        crate::git::pull(repo)
    }

    fn diff(&self, repo: &Path, old_head: &str, new_head: &str) -> Result<Vec<DiffEntry>> {
        crate::git::diff(repo, old_head, new_head)
    }
}

/// Open the working copy at `root`, cloning `url` into it when there is none.
///
/// A directory without a `.git` entry is treated as a leftover from a failed
/// clone and is replaced.
pub fn resolve_or_clone(git: &dyn GitOperations, url: &str, root: &Path) -> Result<()> {
    if root.exists() && root.join(".git").exists() {
        git.open(root)
    } else {
        git.clone_repository(url, root)
    }
}
