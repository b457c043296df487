//! Indexing of binary files described by XML metadata documents.
//!
//! A metadata document (a content item with an attachment, say) references
//! one or more binaries through element selectors. When the document changes,
//! each referenced binary is re-indexed with the document's fields attached:
//! every non-empty leaf element contributes its text under its local name,
//! minus the excluded properties. Binaries changed on their own are indexed
//! without metadata.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use regex::Regex;

use super::{
    index_change_set, index_name, Batch, BatchIndexer, IndexService, IndexTarget, Metadata,
};
use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::path::{compile_patterns, matches_any, normalize_repo_path, resolve_in_root};
use crate::xml::{element_name, text_content, DocumentTransformChain, ElementSelector, XmlDocument};

pub struct BinaryFileWithMetadataIndexingProcessor {
    service: Arc<dyn IndexService>,
    target: IndexTarget,
    metadata_patterns: Vec<Regex>,
    binary_patterns: Vec<Regex>,
    reference_selectors: Vec<ElementSelector>,
    exclude_properties: Vec<String>,
    chain: DocumentTransformChain,
}

impl BinaryFileWithMetadataIndexingProcessor {
    pub fn new(
        service: Arc<dyn IndexService>,
        target: IndexTarget,
        metadata_patterns: &[String],
        binary_patterns: &[String],
        reference_selectors: &[String],
        exclude_properties: Vec<String>,
        chain: DocumentTransformChain,
    ) -> Result<Self> {
        Ok(Self {
            service,
            target,
            metadata_patterns: compile_patterns(metadata_patterns)?,
            binary_patterns: compile_patterns(binary_patterns)?,
            reference_selectors: reference_selectors
                .iter()
                .map(|s| ElementSelector::parse(s))
                .collect::<Result<Vec<_>>>()?,
            exclude_properties,
            chain,
        })
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        index_change_set(self, self.service.as_ref(), &self.target, site, change_set)?;
        Ok(())
    }

    fn is_metadata(&self, path: &str) -> bool {
        matches_any(path, &self.metadata_patterns)
    }

    fn is_binary(&self, path: &str) -> bool {
        matches_any(path, &self.binary_patterns)
    }

    /// Read a metadata document, returning its fields and the binaries it
    /// references that exist in the working copy.
    fn read_metadata(&self, root: &Path, path: &str) -> Result<(Metadata, Vec<String>)> {
        let file = resolve_in_root(root, path);
        let document = XmlDocument::read(&file)?;
        let document = self.chain.process(document, &file, root)?;
        let xot = document.xot();

        let mut metadata = Metadata::new();
        for node in xot.descendants(document.root_element()?) {
            if xot.element(node).is_none() || xot.children(node).any(|c| xot.element(c).is_some())
            {
                continue;
            }
            let Some(name) = element_name(xot, node) else {
                continue;
            };
            let value = text_content(xot, node).trim().to_string();
            if value.is_empty() || self.exclude_properties.contains(&name) {
                continue;
            }
            metadata.entry(name).or_default().push(value);
        }

        let mut references = Vec::new();
        for selector in &self.reference_selectors {
            for node in document.select(selector) {
                let reference = text_content(xot, node).trim().to_string();
                if reference.is_empty() {
                    continue;
                }
                let reference = normalize_repo_path(&reference);
                if !self.is_binary(&reference) {
                    debug!("Reference {} in {} is not a binary path", reference, path);
                } else if !resolve_in_root(root, &reference).is_file() {
                    warn!("Binary {} referenced by {} does not exist", reference, path);
                } else if !references.contains(&reference) {
                    references.push(reference);
                }
            }
        }

        Ok((metadata, references))
    }
}

impl BatchIndexer for BinaryFileWithMetadataIndexingProcessor {
    fn update(&self, batch: &Batch<'_>, paths: &[String], delete: bool) -> Result<usize> {
        let mut count = 0;

        if delete {
            for path in paths {
                if self.is_binary(path) {
                    batch.service.delete(batch.index_id, batch.site, path)?;
                    info!(
                        "File {} deleted from {} index",
                        path,
                        index_name(batch.index_id)
                    );
                    count += 1;
                } else if self.is_metadata(path) {
                    debug!("Metadata file {} deleted, referenced binaries are kept", path);
                }
            }
            return Ok(count);
        }

        // Binaries re-indexed with metadata in this batch are not sent again bare.
        let mut indexed: HashSet<String> = HashSet::new();

        for path in paths.iter().filter(|p| self.is_metadata(p)) {
            let (metadata, references) = match self.read_metadata(batch.root, path) {
                Ok(read) => read,
                Err(e) => {
                    warn!(
                        "Cannot process metadata file {}. Continuing index update... ({})",
                        path, e
                    );
                    continue;
                }
            };

            for reference in references {
                let file = resolve_in_root(batch.root, &reference);
                batch.service.update_file(
                    batch.index_id,
                    batch.site,
                    &reference,
                    &file,
                    Some(&metadata),
                )?;
                info!(
                    "File {} added to {} index with metadata from {}",
                    file.display(),
                    index_name(batch.index_id),
                    path
                );
                indexed.insert(reference);
                count += 1;
            }
        }

        for path in paths.iter().filter(|p| self.is_binary(p)) {
            if indexed.contains(path.as_str()) {
                continue;
            }
            let file = resolve_in_root(batch.root, path);
            batch
                .service
                .update_file(batch.index_id, batch.site, path, &file, None)?;
            info!(
                "File {} added to {} index",
                file.display(),
                index_name(batch.index_id)
            );
            count += 1;
        }

        Ok(count)
    }
}
