//! Include flattening.
//!
//! An include marker is an element (by default `<include>`) whose trimmed text
//! is the path of another document, relative to the content root. Flattening
//! replaces each marker with a copy of the referenced document's root element,
//! after flattening that document first.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use xot::{Node, Xot};

use super::selector::ElementSelector;
use super::{canonical, element_name, text_content, XmlDocument};
use crate::error::{Error, Result};
use crate::path::resolve_in_root;

pub const DEFAULT_INCLUDE_ELEMENT_SELECTOR: &str = "//include";
pub const DEFAULT_DISABLE_FLATTENING_ELEMENT: &str = "disabledFlattening";
pub const DEFAULT_PAGE_ELEMENT: &str = "page";

/// Resolves include markers recursively, with cycle detection.
#[derive(Debug, Clone)]
pub struct FlatteningTransform {
    include_selector: ElementSelector,
    disable_flattening_element: String,
    disable_nested_page_flattening: bool,
    page_element: String,
}

impl Default for FlatteningTransform {
    fn default() -> Self {
        Self {
            include_selector: ElementSelector::parse(DEFAULT_INCLUDE_ELEMENT_SELECTOR)
                .unwrap_or_else(|_| unreachable!("default include selector is valid")),
            disable_flattening_element: DEFAULT_DISABLE_FLATTENING_ELEMENT.to_string(),
            disable_nested_page_flattening: false,
            page_element: DEFAULT_PAGE_ELEMENT.to_string(),
        }
    }
}

impl FlatteningTransform {
    pub fn with_include_selector(mut self, selector: &str) -> Result<Self> {
        self.include_selector = ElementSelector::parse(selector)?;
        Ok(self)
    }

    pub fn with_disable_flattening_element(mut self, element: impl Into<String>) -> Self {
        self.disable_flattening_element = element.into();
        self
    }

    /// Leave includes whose target is itself a page (root element named like
    /// the page marker) unspliced.
    pub fn with_disable_nested_page_flattening(mut self, disable: bool) -> Self {
        self.disable_nested_page_flattening = disable;
        self
    }

    pub fn with_page_element(mut self, element: impl Into<String>) -> Self {
        self.page_element = element.into();
        self
    }

    /// Flatten `document`, read from `file`, resolving includes against
    /// `root_folder`.
    ///
    /// The visited set lives for this call only and is seeded with `file`.
    /// A file already in it is never parsed again, which both stops cycles
    /// and means a document is spliced at most once per top-level call.
    pub fn apply(&self, document: &mut XmlDocument, file: &Path, root_folder: &Path) -> Result<()> {
        let mut visited: Vec<PathBuf> = Vec::new();
        let node = document.document();
        self.flatten(document.xot_mut(), node, file, root_folder, &mut visited)
    }

    fn flatten(
        &self,
        xot: &mut Xot,
        document: Node,
        file: &Path,
        root_folder: &Path,
        visited: &mut Vec<PathBuf>,
    ) -> Result<()> {
        visited.push(canonical(file));

        let includes = self.include_selector.select(xot, document);
        if includes.is_empty() {
            return Ok(());
        }

        for include in includes {
            if self.flattening_disabled(xot, include) {
                debug!("Flattening disabled for include in {}", file.display());
                continue;
            }

            let include_src = text_content(xot, include).trim().to_string();
            if include_src.is_empty() {
                continue;
            }

            let include_file = resolve_in_root(root_folder, &include_src);
            if visited.contains(&canonical(&include_file)) {
                warn!(
                    "Circular inclusion detected. File {} already included",
                    include_file.display()
                );
                continue;
            }
            if !include_file.is_file() {
                warn!("No file found for include at {}", include_file.display());
                continue;
            }

            debug!("Include found in {}: {}", file.display(), include_src);

            let label = include_file.display().to_string();
            let text = fs::read_to_string(&include_file).map_err(|e| Error::xml(label.as_str(), e))?;
            let included = xot.parse(&text).map_err(|e| Error::xml(label.as_str(), e))?;
            self.flatten(xot, included, &include_file, root_folder, visited)?;

            let included_root = xot
                .document_element(included)
                .map_err(|e| Error::xml(label.as_str(), e))?;

            if self.disable_nested_page_flattening && self.is_page(xot, included_root) {
                debug!("Not flattening nested page {}", label);
                continue;
            }

            splice(xot, include, included_root).map_err(|e| Error::xml(label.as_str(), e))?;
        }

        Ok(())
    }

    /// Whether the include's parent carries a disable flag set to true.
    fn flattening_disabled(&self, xot: &Xot, include: Node) -> bool {
        let parent = match xot.parent(include) {
            Some(parent) => parent,
            None => return false,
        };

        xot.children(parent)
            .find(|child| {
                element_name(xot, *child).as_deref() == Some(self.disable_flattening_element.as_str())
            })
            .map(|flag| text_content(xot, flag).trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    fn is_page(&self, xot: &Xot, root: Node) -> bool {
        element_name(xot, root).is_some_and(|name| name.eq_ignore_ascii_case(&self.page_element))
    }
}

/// Replace `marker` with a deep copy of `source`, at the marker's position.
fn splice(xot: &mut Xot, marker: Node, source: Node) -> std::result::Result<(), xot::Error> {
    let copy = xot.clone_node(source);
    xot.insert_before(marker, copy)?;
    xot.remove(marker)
}
