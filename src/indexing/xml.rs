//! Indexing of XML content files.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use super::{index_change_set, index_name, Batch, BatchIndexer, IndexService, IndexTarget};
use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::path::resolve_in_root;
use crate::xml::{DocumentTransformChain, XmlDocument};

const XML_EXTENSION: &str = ".xml";

/// Sends `.xml` paths to the index after running them through a transform
/// chain. Other paths are ignored.
///
/// A file that cannot be parsed or transformed is logged and skipped; an
/// index service failure aborts the batch.
pub struct XmlFileIndexingProcessor {
    service: Arc<dyn IndexService>,
    target: IndexTarget,
    chain: DocumentTransformChain,
}

impl XmlFileIndexingProcessor {
    pub fn new(
        service: Arc<dyn IndexService>,
        target: IndexTarget,
        chain: DocumentTransformChain,
    ) -> Self {
        Self {
            service,
            target,
            chain,
        }
    }

    pub fn target(&self) -> &IndexTarget {
        &self.target
    }

    pub fn chain(&self) -> &DocumentTransformChain {
        &self.chain
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        index_change_set(self, self.service.as_ref(), &self.target, site, change_set)?;
        Ok(())
    }

    /// Read `file`, transform it and serialize it compactly.
    fn process_xml(&self, root: &Path, file: &Path) -> Result<String> {
        let document = XmlDocument::read(file)?;
        let document = self.chain.process(document, file, root)?;
        let xml = document.into_compact_string()?;

        debug!("Processed XML file {}:", file.display());
        debug!("{}", xml);

        Ok(xml)
    }
}

impl BatchIndexer for XmlFileIndexingProcessor {
    fn update(&self, batch: &Batch<'_>, paths: &[String], delete: bool) -> Result<usize> {
        let mut count = 0;

        for path in paths.iter().filter(|p| p.ends_with(XML_EXTENSION)) {
            let file = resolve_in_root(batch.root, path);

            if delete {
                batch.service.delete(batch.index_id, batch.site, path)?;
                info!(
                    "File {} deleted from {} index",
                    file.display(),
                    index_name(batch.index_id)
                );
                count += 1;
                continue;
            }

            let xml = match self.process_xml(batch.root, &file) {
                Ok(xml) => xml,
                Err(e) => {
                    warn!(
                        "Cannot process XML file {}. Continuing index update... ({})",
                        file.display(),
                        e
                    );
                    continue;
                }
            };

            batch
                .service
                .update(batch.index_id, batch.site, path, &xml, true)?;
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
