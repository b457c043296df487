//! # Document Transform Chain
//!
//! XML content is prepared for indexing by running it through an ordered list
//! of transforms, each consuming the previous stage's output:
//!
//! - [`FlatteningTransform`] splices `<include>`d documents in place,
//! - [`FieldRenamingTransform`] renames selected elements,
//! - [`TokenizeTransform`] appends analyzed-field duplicates of flagged
//!   elements.
//!
//! Documents live in a `xot` arena: nodes are indices into one tree store,
//! and structural edits (insert, remove, append) go through the arena rather
//! than through live iterators, so selections are always collected before
//! the tree is edited.

pub mod flatten;
pub mod rename;
pub mod selector;
pub mod tokenize;

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use xot::{Node, Xot};

use crate::error::{Error, Result};

pub use flatten::FlatteningTransform;
pub use rename::FieldRenamingTransform;
pub use selector::ElementSelector;
pub use tokenize::TokenizeTransform;

/// Declaration written in front of compact output.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// A parsed XML document and the arena that owns its nodes.
///
/// Documents pulled in by flattening are parsed into the same arena so their
/// nodes can be copied into this tree.
pub struct XmlDocument {
    xot: Xot,
    document: Node,
    source: String,
}

impl XmlDocument {
    /// Parse a document from text; `source` names it in error messages.
    pub fn parse(text: &str, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut xot = Xot::new();
        let document = xot.parse(text).map_err(|e| Error::xml(source.as_str(), e))?;
        Ok(Self {
            xot,
            document,
            source,
        })
    }

    /// Read and parse a UTF-8 document from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::xml(path.display().to_string(), e))?;
        Self::parse(&text, path.display().to_string())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn xot(&self) -> &Xot {
        &self.xot
    }

    pub(crate) fn xot_mut(&mut self) -> &mut Xot {
        &mut self.xot
    }

    pub(crate) fn document(&self) -> Node {
        self.document
    }

    /// The single top-level element.
    pub fn root_element(&self) -> Result<Node> {
        self.xot
            .document_element(self.document)
            .map_err(|e| Error::xml(self.source.as_str(), e))
    }

    /// Local name of the top-level element.
    pub fn root_name(&self) -> Result<String> {
        let root = self.root_element()?;
        Ok(element_name(&self.xot, root).unwrap_or_default())
    }

    /// Elements matching `selector`, in document order.
    pub fn select(&self, selector: &ElementSelector) -> Vec<Node> {
        selector.select(&self.xot, self.document)
    }

    /// Serialize without any declaration, keeping whitespace as parsed.
    pub fn to_xml_string(&self) -> Result<String> {
        self.xot
            .to_string(self.document)
            .map_err(|e| Error::xml(self.source.as_str(), e))
    }

    /// Serialize in compact form: whitespace-only text is dropped and the
    /// output starts with the XML declaration on its own line.
    pub fn into_compact_string(mut self) -> Result<String> {
        let blank: Vec<Node> = self
            .xot
            .descendants(self.document)
            .filter(|node| {
                self.xot
                    .text_str(*node)
                    .is_some_and(|text| text.trim().is_empty())
            })
            .collect();
        for node in blank {
            self.xot
                .remove(node)
                .map_err(|e| Error::xml(self.source.as_str(), e))?;
        }

        let body = self.to_xml_string()?;
        Ok(format!("{}\n{}", XML_DECLARATION, body))
    }
}

/// Local name of an element node, `None` for other node kinds.
pub(crate) fn element_name(xot: &Xot, node: Node) -> Option<String> {
    xot.element(node)
        .map(|element| xot.local_name_str(element.name()).to_string())
}

/// Concatenated text of all text nodes below `node`.
pub(crate) fn text_content(xot: &Xot, node: Node) -> String {
    xot.descendants(node)
        .filter_map(|n| xot.text_str(n))
        .collect()
}

/// One stage of a [`DocumentTransformChain`].
#[derive(Debug, Clone)]
pub enum DocumentTransform {
    Flatten(FlatteningTransform),
    RenameFields(FieldRenamingTransform),
    Tokenize(TokenizeTransform),
}

impl DocumentTransform {
    /// Apply this stage to `document`, which was read from `file` inside the
    /// content tree rooted at `root_folder`.
    pub fn apply(&self, document: &mut XmlDocument, file: &Path, root_folder: &Path) -> Result<()> {
        match self {
            DocumentTransform::Flatten(t) => t.apply(document, file, root_folder),
            DocumentTransform::RenameFields(t) => t.apply(document),
            DocumentTransform::Tokenize(t) => t.apply(document),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DocumentTransform::Flatten(_) => "flatten",
            DocumentTransform::RenameFields(_) => "renameFields",
            DocumentTransform::Tokenize(_) => "tokenize",
        }
    }
}

/// An ordered list of transforms applied before a document is indexed.
#[derive(Debug, Clone, Default)]
pub struct DocumentTransformChain {
    transforms: Vec<DocumentTransform>,
}

impl DocumentTransformChain {
    pub fn new(transforms: Vec<DocumentTransform>) -> Self {
        Self { transforms }
    }

    /// Field renaming followed by tokenization.
    pub fn standard(renaming: FieldRenamingTransform, tokenize: TokenizeTransform) -> Self {
        Self::new(vec![
            DocumentTransform::RenameFields(renaming),
            DocumentTransform::Tokenize(tokenize),
        ])
    }

    /// Include flattening, then the standard chain.
    pub fn flattening(
        flatten: FlatteningTransform,
        renaming: FieldRenamingTransform,
        tokenize: TokenizeTransform,
    ) -> Self {
        let mut chain = Self::standard(renaming, tokenize);
        chain.transforms.insert(0, DocumentTransform::Flatten(flatten));
        chain
    }

    pub fn push(&mut self, transform: DocumentTransform) {
        self.transforms.push(transform);
    }

    pub fn transforms(&self) -> &[DocumentTransform] {
        &self.transforms
    }

    /// Run every stage in order.
    pub fn process(
        &self,
        mut document: XmlDocument,
        file: &Path,
        root_folder: &Path,
    ) -> Result<XmlDocument> {
        for transform in &self.transforms {
            debug!("Applying {} transform to {}", transform.name(), file.display());
            transform.apply(&mut document, file, root_folder)?;
        }
        Ok(document)
    }
}

/// Canonical form of `path` for visited-set comparisons, falling back to the
/// path itself when it cannot be resolved.
pub(crate) fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
