//! Indexing of binary documents (PDFs, office files, images...).

use std::sync::Arc;

use log::{debug, info};

use super::{index_change_set, index_name, Batch, BatchIndexer, IndexService, IndexTarget};
use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::path::resolve_in_root;

/// Sends binary files to the index by file handle.
///
/// With an empty allow-list every path is eligible; otherwise only paths
/// whose guessed MIME type is listed, for deletes as well as updates.
pub struct BinaryFileIndexingProcessor {
    service: Arc<dyn IndexService>,
    target: IndexTarget,
    supported_mime_types: Vec<String>,
}

impl BinaryFileIndexingProcessor {
    pub fn new(
        service: Arc<dyn IndexService>,
        target: IndexTarget,
        supported_mime_types: Vec<String>,
    ) -> Self {
        Self {
            service,
            target,
            supported_mime_types,
        }
    }

    pub fn supported_mime_types(&self) -> &[String] {
        &self.supported_mime_types
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        index_change_set(self, self.service.as_ref(), &self.target, site, change_set)?;
        Ok(())
    }

    fn is_eligible(&self, path: &str) -> bool {
        if self.supported_mime_types.is_empty() {
            return true;
        }
        match detect_mime_type(path) {
            Some(mime) if self.supported_mime_types.contains(&mime) => {
                debug!("File {} with mime-type '{}' will be indexed...", path, mime);
                true
            }
            _ => false,
        }
    }
}

/// Guess a MIME type from the path's extension.
pub fn detect_mime_type(path: &str) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.to_string())
}

impl BatchIndexer for BinaryFileIndexingProcessor {
    fn update(&self, batch: &Batch<'_>, paths: &[String], delete: bool) -> Result<usize> {
        let mut count = 0;

        for path in paths.iter().filter(|p| self.is_eligible(p)) {
            let file = resolve_in_root(batch.root, path);

            if delete {
                batch.service.delete(batch.index_id, batch.site, path)?;
                info!(
                    "File {} deleted from {} index",
                    file.display(),
                    index_name(batch.index_id)
                );
            } else {
                batch
                    .service
                    .update_file(batch.index_id, batch.site, path, &file, None)?;
                info!(
                    "File {} added to {} index",
                    file.display(),
                    index_name(batch.index_id)
                );
            }
            count += 1;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::testing::{site, strings, RecordingIndexService};
    use std::path::Path;

    fn run(mime_types: &[&str], change_set: ChangeSet) -> Vec<String> {
        let service = Arc::new(RecordingIndexService::default());
        let processor = BinaryFileIndexingProcessor::new(
            service.clone(),
            IndexTarget::default(),
            strings(mime_types),
        );
        processor
            .process(&site("s", Path::new("/srv/s")), &change_set)
            .unwrap();
        service.calls()
    }

    #[test]
    fn test_empty_allow_list_accepts_everything() {
        let calls = run(
            &[],
            ChangeSet::new(strings(&["/doc.pdf", "/data.bin"]), Vec::new(), strings(&["/old.docx"])),
        );

        assert_eq!(
            calls,
            vec![
                "update_file Some(\"s-default\") s /doc.pdf",
                "update_file Some(\"s-default\") s /data.bin",
                "delete Some(\"s-default\") s /old.docx",
                "commit Some(\"s-default\")",
            ]
        );
    }

    #[test]
    fn test_allow_list_filters_updates_and_deletes() {
        let calls = run(
            &["application/pdf"],
            ChangeSet::new(
                strings(&["/doc.pdf", "/image.png"]),
                strings(&["/page.xml"]),
                strings(&["/old.pdf", "/old.png"]),
            ),
        );

        assert_eq!(
            calls,
            vec![
                "update_file Some(\"s-default\") s /doc.pdf",
                "delete Some(\"s-default\") s /old.pdf",
                "commit Some(\"s-default\")",
            ]
        );
    }

    #[test]
    fn test_nothing_eligible_means_no_commit() {
        let calls = run(
            &["application/pdf"],
            ChangeSet::new(strings(&["/a.png"]), Vec::new(), Vec::new()),
        );
        assert!(calls.is_empty());
    }

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type("/a/b.pdf").as_deref(), Some("application/pdf"));
        assert_eq!(detect_mime_type("/a/b.png").as_deref(), Some("image/png"));
        assert_eq!(detect_mime_type("/a/noextension"), None);
    }
}
