//! Runs an external command for each created or updated file.

use std::process::Command;

use log::{debug, error, warn};
use regex::Regex;

use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::path::{compile_patterns, matches_any};

/// Token replaced by the site id.
pub const SITE_TOKEN: &str = "SITE";
/// Token replaced by the working copy root.
pub const ROOT_TOKEN: &str = "ROOT";
/// Token replaced by the changed file's root-relative path.
pub const FILE_TOKEN: &str = "FILE";

/// Runs a command line for every created or updated path matching one of its
/// patterns. Deleted paths are ignored.
///
/// The command is split on whitespace first, then each argument has its
/// tokens substituted in a single pass: substituted values are never scanned
/// again, and a value containing spaces stays one argument. It is executed
/// directly, without a shell. A command that cannot be run, or exits with a
/// failure status, is logged and the next file proceeds.
pub struct CommandProcessor {
    command: String,
    match_patterns: Vec<Regex>,
}

impl CommandProcessor {
    pub fn new(command: impl Into<String>, match_patterns: &[String]) -> Result<Self> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(Error::config("command processor needs a non-empty command"));
        }
        Ok(Self {
            command,
            match_patterns: compile_patterns(match_patterns)?,
        })
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        let root = site.local_repo_path.display().to_string();
        for path in change_set.created().iter().chain(change_set.updated()) {
            if matches_any(path, &self.match_patterns) {
                debug!("Processing {}", path);
                if let Err(e) = self.run(&site.id, &root, path) {
                    error!("Error while processing {}: {}", path, e);
                }
            } else {
                debug!("{} does not match a pattern.", path);
            }
        }
        Ok(())
    }

    /// The argument vector for one file.
    pub fn render(&self, site: &str, root: &str, file: &str) -> Vec<String> {
        let tokens = [(SITE_TOKEN, site), (ROOT_TOKEN, root), (FILE_TOKEN, file)];
        self.command
            .split_whitespace()
            .map(|arg| substitute(arg, &tokens))
            .collect()
    }

    fn run(&self, site: &str, root: &str, file: &str) -> Result<()> {
        let args = self.render(site, root, file);
        let (program, rest) = match args.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };
        debug!("Running command: {}", args.join(" "));

        let output = Command::new(program)
            .args(rest)
            .output()
            .map_err(|e| Error::Command {
                command: args.join(" "),
                message: e.to_string(),
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!("{}", line);
        }

        if !output.status.success() {
            warn!("Command `{}` exited with {}", args.join(" "), output.status);
        }
        Ok(())
    }
}

/// Replace every token occurrence in `arg`, scanning left to right once.
fn substitute(arg: &str, tokens: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    'scan: while !rest.is_empty() {
        for (token, value) in tokens {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}
