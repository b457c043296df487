//! # Site Configuration
//!
//! Each deployed site is described by one YAML file in a configuration
//! directory. The file stem is the site id unless the file sets `siteId`:
//!
//! ```yaml
//! name: My Site
//! localRepositoryRoot: /var/sites/mysite
//! gitRepositoryUrl: https://git.example.com/mysite.git
//! processors:
//!   - type: xmlIndexing
//!     indexId: main
//! ```
//!
//! ## Key Components
//!
//! - **`SiteFile`**: the serde view of one file, processors still as
//!   [`ProcessorSpec`] records.
//! - **`SiteConfig`**: a loaded site with its processors built and ordered.
//! - **`SiteConfigSource`**: where the sync engine gets its sites from.
//!   [`YamlSiteConfigLoader`] reads a directory of site files; tests use
//!   in-memory sources.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::{Processor, ProcessorRegistry, ProcessorSpec};

/// Extension of site configuration files.
pub const SITE_FILE_EXTENSION: &str = "yaml";

/// One site file, as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SiteFile {
    /// Display name; defaults to the site id.
    #[serde(default)]
    pub name: Option<String>,
    /// Overrides the id taken from the file name.
    #[serde(default)]
    pub site_id: Option<String>,
    /// Where the site's working copy lives.
    pub local_repository_root: PathBuf,
    /// The remote the working copy is cloned from and pulled from.
    pub git_repository_url: String,
    /// Ordered processor records.
    #[serde(default)]
    pub processors: Vec<ProcessorSpec>,
}

/// Parse the YAML text of a site file.
pub fn parse_site_file(yaml_content: &str) -> Result<SiteFile> {
    let site: SiteFile = serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some(
            "a site file needs localRepositoryRoot and gitRepositoryUrl, and optionally \
             name, siteId and processors"
                .to_string(),
        ),
    })?;

    if site.git_repository_url.trim().is_empty() {
        return Err(Error::config("gitRepositoryUrl must not be empty"));
    }
    if site.local_repository_root.as_os_str().is_empty() {
        return Err(Error::config("localRepositoryRoot must not be empty"));
    }
    Ok(site)
}

/// A site ready to sync: its repository and its built, ordered processors.
pub struct SiteConfig {
    pub id: String,
    pub name: String,
    pub local_repo_path: PathBuf,
    pub remote_url: String,
    pub processors: Vec<Processor>,
}

impl SiteConfig {
    pub fn new(
        id: impl Into<String>,
        local_repo_path: impl Into<PathBuf>,
        remote_url: impl Into<String>,
        processors: Vec<Processor>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            local_repo_path: local_repo_path.into(),
            remote_url: remote_url.into(),
            processors,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Build a site from its file; `file_id` is the id implied by the file
    /// name.
    pub fn from_file(file_id: &str, file: &SiteFile, registry: &ProcessorRegistry) -> Result<Self> {
        let id = file
            .site_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| file_id.to_string());
        let processors = registry.build_all(&file.processors)?;
        let site = SiteConfig::new(
            id,
            file.local_repository_root.clone(),
            file.git_repository_url.clone(),
            processors,
        );
        Ok(match &file.name {
            Some(name) if !name.is_empty() => site.with_name(name.clone()),
            _ => site,
        })
    }
}

impl fmt::Debug for SiteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("local_repo_path", &self.local_repo_path)
            .field("remote_url", &self.remote_url)
            .field("processors", &self.processors)
            .finish()
    }
}

/// Where the engine finds the sites to sync.
pub trait SiteConfigSource: Send + Sync {
    /// Ids of every configured site, in the order they should run.
    fn site_ids(&self) -> Result<Vec<String>>;

    /// Load one site, building its processors.
    fn load_site(&self, id: &str) -> Result<SiteConfig>;
}

/// Reads `<dir>/<site>.yaml` files.
pub struct YamlSiteConfigLoader {
    dir: PathBuf,
    registry: ProcessorRegistry,
}

impl YamlSiteConfigLoader {
    pub fn new(dir: impl Into<PathBuf>, registry: ProcessorRegistry) -> Self {
        Self {
            dir: dir.into(),
            registry,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn site_file_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, SITE_FILE_EXTENSION))
    }
}

impl SiteConfigSource for YamlSiteConfigLoader {
    fn site_ids(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Err(Error::Configuration {
                message: format!(
                    "site configuration directory {} does not exist",
                    self.dir.display()
                ),
            });
        }

        let pattern = self.dir.join(format!("*.{}", SITE_FILE_EXTENSION));
        let pattern = pattern.to_string_lossy();
        let mut ids = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        debug!("Found {} site file(s) in {}", ids.len(), self.dir.display());
        Ok(ids)
    }

    fn load_site(&self, id: &str) -> Result<SiteConfig> {
        let path = self.site_file_path(id);
        let content = fs::read_to_string(&path)?;
        let file = parse_site_file(&content).map_err(|e| match e {
            Error::ConfigParse { message, hint } => Error::ConfigParse {
                message: format!("{}: {}", path.display(), message),
                hint,
            },
            other => other,
        })?;
        SiteConfig::from_file(id, &file, &self.registry)
    }
}
