//! # Indexing Processors
//!
//! Leaf processors that turn change-set paths into index mutations on an
//! [`IndexService`]. The search engine itself is a collaborator: this crate
//! only decides which documents to send, in which order, and when to commit.
//!
//! The XML, binary and binary-with-metadata leaves share one batch shape,
//! implemented once in [`index_change_set`]:
//!
//! 1. resolve the effective site name and index id,
//! 2. index created paths, then updated paths, then delete deleted paths,
//!    each list in input order, counting mutations,
//! 3. commit once if anything was sent, otherwise make no call at all.

pub mod binary;
pub mod metadata;
pub mod xml;

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::path::format_placeholder;

pub use binary::BinaryFileIndexingProcessor;
pub use metadata::BinaryFileWithMetadataIndexingProcessor;
pub use xml::XmlFileIndexingProcessor;

pub const DEFAULT_INDEX_ID_FORMAT: &str = "%s-default";

/// Extra fields attached to a binary document, by field name.
pub type Metadata = HashMap<String, Vec<String>>;

/// The search-engine client.
///
/// `index_id` is `None` when documents go to the engine's default index.
pub trait IndexService: Send + Sync {
    /// Index (or re-index) a document from its serialized XML body.
    fn update(
        &self,
        index_id: Option<&str>,
        site: &str,
        doc_id: &str,
        xml: &str,
        commit_now: bool,
    ) -> Result<()>;

    /// Index a binary file; text extraction is the service's job.
    fn update_file(
        &self,
        index_id: Option<&str>,
        site: &str,
        doc_id: &str,
        file: &Path,
        metadata: Option<&Metadata>,
    ) -> Result<()>;

    fn delete(&self, index_id: Option<&str>, site: &str, doc_id: &str) -> Result<()>;

    fn commit(&self, index_id: Option<&str>) -> Result<()>;
}

/// An index service that only logs what it would send.
///
/// Used by the CLI, which has no search-engine client of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingIndexService;

impl IndexService for LoggingIndexService {
    fn update(
        &self,
        index_id: Option<&str>,
        site: &str,
        doc_id: &str,
        xml: &str,
        commit_now: bool,
    ) -> Result<()> {
        info!(
            "[dry-run] update {} in {} index for site {} ({} bytes, commit={})",
            doc_id,
            index_name(index_id),
            site,
            xml.len(),
            commit_now
        );
        debug!("{}", xml);
        Ok(())
    }

    fn update_file(
        &self,
        index_id: Option<&str>,
        site: &str,
        doc_id: &str,
        file: &Path,
        metadata: Option<&Metadata>,
    ) -> Result<()> {
        info!(
            "[dry-run] update file {} ({}) in {} index for site {}{}",
            doc_id,
            file.display(),
            index_name(index_id),
            site,
            metadata
                .map(|m| format!(" with {} metadata field(s)", m.len()))
                .unwrap_or_default()
        );
        Ok(())
    }

    fn delete(&self, index_id: Option<&str>, site: &str, doc_id: &str) -> Result<()> {
        info!(
            "[dry-run] delete {} from {} index for site {}",
            doc_id,
            index_name(index_id),
            site
        );
        Ok(())
    }

    fn commit(&self, index_id: Option<&str>) -> Result<()> {
        info!("[dry-run] commit {} index", index_name(index_id));
        Ok(())
    }
}

/// `'id'` for a named index, `default` otherwise. Used in log lines.
pub fn index_name(index_id: Option<&str>) -> String {
    match index_id {
        Some(id) if !id.is_empty() => format!("'{}'", id),
        _ => "default".to_string(),
    }
}

/// Where an indexing processor sends its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    /// Explicit index id; wins over the derived one.
    pub index_id: Option<String>,
    /// `%s` is replaced by the site name to derive an index id.
    pub default_index_id_format: String,
    /// Send everything to the service's default index.
    pub use_no_index_id: bool,
    /// Overrides the site id of the site being processed.
    pub site_name: Option<String>,
}

impl Default for IndexTarget {
    fn default() -> Self {
        Self {
            index_id: None,
            default_index_id_format: DEFAULT_INDEX_ID_FORMAT.to_string(),
            use_no_index_id: false,
            site_name: None,
        }
    }
}

impl IndexTarget {
    pub fn actual_site_name(&self, site: &SiteConfig) -> String {
        match self.site_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => site.id.clone(),
        }
    }

    pub fn actual_index_id(&self, site_name: &str) -> Option<String> {
        if self.use_no_index_id {
            return None;
        }
        match self.index_id.as_deref() {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => Some(format_placeholder(&self.default_index_id_format, site_name)),
        }
    }
}

/// One resolved batch: the index, the site and the working copy it reads from.
pub struct Batch<'a> {
    pub service: &'a dyn IndexService,
    pub index_id: Option<&'a str>,
    pub site: &'a str,
    pub root: &'a Path,
}

/// The per-path half of an indexing processor.
pub trait BatchIndexer {
    /// Send `paths` to the index, returning how many mutations were issued.
    fn update(&self, batch: &Batch<'_>, paths: &[String], delete: bool) -> Result<usize>;
}

/// Run a change set through `indexer`, committing once if anything was sent.
///
/// Returns the number of mutations issued.
pub fn index_change_set(
    indexer: &dyn BatchIndexer,
    service: &dyn IndexService,
    target: &IndexTarget,
    site: &SiteConfig,
    change_set: &ChangeSet,
) -> Result<usize> {
    let site_name = target.actual_site_name(site);
    let index_id = target.actual_index_id(&site_name);
    let batch = Batch {
        service,
        index_id: index_id.as_deref(),
        site: &site_name,
        root: &site.local_repo_path,
    };

    let mut count = 0;
    if !change_set.created().is_empty() {
        count += indexer.update(&batch, change_set.created(), false)?;
    }
    if !change_set.updated().is_empty() {
        count += indexer.update(&batch, change_set.updated(), false)?;
    }
    if !change_set.deleted().is_empty() {
        count += indexer.update(&batch, change_set.deleted(), true)?;
    }

    if count > 0 {
        service.commit(batch.index_id)?;
    }

    Ok(count)
}
