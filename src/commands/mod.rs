//! # CLI Command Implementations
//!
//! Each subcommand of `content-deployer` lives in its own file and provides:
//! - an `Args` struct with the command's arguments, derived using `clap`;
//! - an `execute` function taking the parsed `Args` and calling into the
//!   `content_deployer` library.

pub mod check;
pub mod run;

use std::path::PathBuf;
use std::sync::Arc;

use content_deployer::config::YamlSiteConfigLoader;
use content_deployer::indexing::LoggingIndexService;
use content_deployer::pipeline::{LoggingMailSender, ProcessorRegistry};

/// The site loader both commands use: the built-in processor types, with
/// indexing and mail going to their logging stand-ins.
pub fn site_loader(config_dir: Option<PathBuf>) -> YamlSiteConfigLoader {
    let config_dir = config_dir.unwrap_or_else(content_deployer::defaults::default_config_dir);
    let registry = ProcessorRegistry::new()
        .with_index_service(Arc::new(LoggingIndexService))
        .with_mail_sender(Arc::new(LoggingMailSender));
    YamlSiteConfigLoader::new(config_dir, registry)
}
