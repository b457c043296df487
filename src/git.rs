use std::fs;
use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};
use crate::repository::{ChangeKind, DiffEntry, PullOutcome};

/// Run `git -C <repo> <args>` and return its trimmed stdout.
fn run_git(repo: &Path, args: &[&str]) -> Result<String> {
    let command = args.join(" ");
    debug!("git -C {} {}", repo.display(), command);

    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            path: repo.display().to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command,
            path: repo.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Clone a repository into `target_dir`
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Personal access tokens
/// - Any authentication configured in ~/.gitconfig
pub fn clone_repository(url: &str, target_dir: &Path) -> Result<()> {
    // git won't clone into an existing non-empty directory
    if target_dir.exists() {
        if target_dir.is_dir() {
            fs::remove_dir_all(target_dir)?;
        } else {
            fs::remove_file(target_dir)?;
        }
    }

    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("Cloning from {} to {}", url, target_dir.display());

    let output = Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitClone {
            url: url.to_string(),
            path: target_dir.display().to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        let message = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            format!(
                "Authentication failed. Make sure the deployer has access to the repository.\n\
                Error: {}",
                stderr.trim()
            )
        } else {
            stderr.trim().to_string()
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            path: target_dir.display().to_string(),
            message,
        });
    }

    Ok(())
}

/// Verify that `repo` is a git working copy.
pub fn open_repository(repo: &Path) -> Result<()> {
    run_git(repo, &["rev-parse", "--git-dir"]).map(|_| ())
}

/// Resolve the commit id `HEAD` currently points at.
pub fn resolve_head(repo: &Path) -> Result<String> {
    run_git(repo, &["rev-parse", "HEAD"])
}

/// Pull from the tracked remote, accepting fast-forwards only.
///
/// A refused fast-forward (diverged history, conflicts) is reported as
/// [`PullOutcome::Unsupported`] rather than an error: the working copy is
/// left untouched and nothing tries to merge.
pub fn pull(repo: &Path) -> Result<PullOutcome> {
    let before = resolve_head(repo)?;

    match run_git(repo, &["pull", "--ff-only"]) {
        Ok(stdout) => debug!("Pulled from the remote repository: {}", stdout),
        Err(Error::GitCommand { stderr, .. }) if is_refused_fast_forward(&stderr) => {
            return Ok(PullOutcome::Unsupported(stderr));
        }
        Err(e) => return Err(e),
    }

    let after = resolve_head(repo)?;
    if after == before {
        Ok(PullOutcome::UpToDate)
    } else {
        Ok(PullOutcome::FastForward(after))
    }
}

fn is_refused_fast_forward(stderr: &str) -> bool {
    stderr.contains("Not possible to fast-forward")
        || stderr.contains("not possible to fast-forward")
        || stderr.contains("diverging branches")
        || stderr.contains("CONFLICT")
        || stderr.contains("would be overwritten by merge")
}

/// Compute the tree diff between two commits, with rename detection.
pub fn diff(repo: &Path, old: &str, new: &str) -> Result<Vec<DiffEntry>> {
    let output = run_git(
        repo,
        &["diff", "--name-status", "-M", "-z", "--no-color", old, new],
    )?;
    parse_name_status(&output)
}

/// Parse the NUL-separated output of `git diff --name-status -z`.
///
/// Each record is a status token followed by one path, or two paths for
/// renames and copies. Copies are reported as an add of the new path.
pub fn parse_name_status(output: &str) -> Result<Vec<DiffEntry>> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut entries = Vec::new();

    while let Some(status) = fields.next() {
        let status = status.trim();
        let mut next_path = || {
            fields.next().map(str::to_string).ok_or_else(|| Error::GitCommand {
                command: "diff --name-status".to_string(),
                path: String::new(),
                stderr: format!("missing path after status '{}'", status),
            })
        };

        let entry = match status.chars().next() {
            Some('A') => DiffEntry::added(next_path()?),
            Some('M') | Some('T') => DiffEntry::modified(next_path()?),
            Some('D') => DiffEntry::deleted(next_path()?),
            Some('R') => {
                let old = next_path()?;
                let new = next_path()?;
                DiffEntry::renamed(old, new)
            }
            Some('C') => {
                let _source = next_path()?;
                DiffEntry::added(next_path()?)
            }
            _ => {
                debug!("Ignoring diff status '{}'", status);
                next_path()?;
                continue;
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}
