//! # Check Command Implementation
//!
//! Loads every site file in the configuration directory and builds its
//! processor pipeline without touching any repository, printing the
//! processor tree of each site. The first site that fails to load stops the
//! command with an error.
//!
//! This command is a safe, read-only operation.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use content_deployer::config::SiteConfigSource;

/// Validate site files and show the processors each site would run
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Directory holding one `<site>.yaml` file per site.
    ///
    /// Defaults to `~/.config/content-deployer/sites` on Linux.
    #[arg(long, value_name = "DIR", env = "CONTENT_DEPLOYER_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs) -> Result<()> {
    let loader = super::site_loader(args.config_dir);
    println!("Checking sites in: {}", loader.dir().display());

    let site_ids = loader.site_ids()?;
    if site_ids.is_empty() {
        println!("No site files found");
        return Ok(());
    }

    for site_id in &site_ids {
        let site = loader
            .load_site(site_id)
            .with_context(|| format!("Failed to load site '{}'", site_id))?;

        println!();
        println!("Site: {} ({})", site.id, site.name);
        println!("  Repository: {}", site.remote_url);
        println!("  Working copy: {}", site.local_repo_path.display());
        if site.processors.is_empty() {
            println!("  Processors: none");
            continue;
        }
        println!("  Processors:");
        for processor in &site.processors {
            for line in processor.describe() {
                println!("    {}", line);
            }
        }
    }

    println!();
    println!("✅ {} site(s) OK", site_ids.len());
    Ok(())
}
