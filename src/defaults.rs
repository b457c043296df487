//! Default values for content-deployer configuration.

use std::path::PathBuf;

/// Returns the default site configuration directory.
///
/// Uses the platform-appropriate config directory:
/// - Linux: `~/.config/content-deployer/sites` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/content-deployer/sites`
/// - Windows: `{FOLDERID_RoamingAppData}\content-deployer\sites`
///
/// Falls back to `sites` in the current directory if the platform config
/// directory cannot be determined.
///
/// This can be overridden by the `--config-dir` CLI flag or the
/// `CONTENT_DEPLOYER_CONFIG_DIR` environment variable.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("content-deployer"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sites")
}
