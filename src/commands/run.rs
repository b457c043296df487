//! # Run Command Implementation
//!
//! Executes one sync pass over every site file in the configuration
//! directory: pull each site's repository and push what changed through its
//! processors. Index mutations go to a dry-run index service that logs them.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use content_deployer::engine::{PassOutcome, RepositorySyncEngine, SiteOutcome};
use content_deployer::repository::DefaultGitOperations;

/// Run one sync pass over every configured site
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory holding one `<site>.yaml` file per site.
    ///
    /// Defaults to `~/.config/content-deployer/sites` on Linux.
    #[arg(long, value_name = "DIR", env = "CONTENT_DEPLOYER_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Load everything but skip the pass, as a disabled deployer would.
    #[arg(long)]
    pub disabled: bool,
}

/// Execute the `run` command.
///
/// Exits with an error when any site failed to load or sync. Processor
/// failures are reported but do not fail the command, since they do not
/// stop the pass.
pub fn execute(args: RunArgs) -> Result<()> {
    let loader = super::site_loader(args.config_dir);
    if !loader.dir().is_dir() {
        anyhow::bail!(
            "Site configuration directory {} does not exist",
            loader.dir().display()
        );
    }
    println!("Syncing sites from: {}", loader.dir().display());

    let engine = RepositorySyncEngine::new(Box::new(loader), Box::new(DefaultGitOperations))
        .with_enabled(!args.disabled);

    let outcome = engine.execute();
    match &outcome {
        PassOutcome::Disabled => {
            println!("Deployer is disabled, nothing to do");
            return Ok(());
        }
        PassOutcome::Skipped => {
            println!("Another sync pass is in progress, skipped");
            return Ok(());
        }
        PassOutcome::Completed(reports) if reports.is_empty() => {
            println!("No sites configured");
        }
        PassOutcome::Completed(reports) => {
            for report in reports {
                println!("  {}: {}", report.site_id, describe(&report.outcome));
            }
        }
    }

    if outcome.has_failures() {
        anyhow::bail!("one or more sites failed to sync");
    }
    Ok(())
}

fn describe(outcome: &SiteOutcome) -> String {
    match outcome {
        SiteOutcome::Synced {
            changes,
            processor_failures: 0,
        } => format!("synced {} change(s)", changes),
        SiteOutcome::Synced {
            changes,
            processor_failures,
        } => format!(
            "synced {} change(s), {} processor(s) failed",
            changes, processor_failures
        ),
        SiteOutcome::UpToDate => "up to date".to_string(),
        SiteOutcome::Unsupported(reason) => format!("pull needs a merge, skipped ({})", reason),
        SiteOutcome::Failed(message) => format!("failed: {}", message),
    }
}
