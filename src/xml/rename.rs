//! Field renaming: change the name of every element a selector matches.

use log::debug;

use super::selector::ElementSelector;
use super::XmlDocument;
use crate::error::Result;

/// Renames selected elements, keeping their attributes and content.
///
/// Mappings are applied in order, each against the output of the previous
/// one, so a later selector sees names an earlier mapping produced.
#[derive(Debug, Clone, Default)]
pub struct FieldRenamingTransform {
    mappings: Vec<(ElementSelector, String)>,
}

impl FieldRenamingTransform {
    /// Build from `(selector, new name)` pairs.
    pub fn new(mappings: &[(&str, &str)]) -> Result<Self> {
        let mappings = mappings
            .iter()
            .map(|(selector, name)| Ok((ElementSelector::parse(selector)?, name.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { mappings })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mappings = pairs
            .into_iter()
            .map(|(selector, name)| Ok((ElementSelector::parse(&selector)?, name)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { mappings })
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn apply(&self, document: &mut XmlDocument) -> Result<()> {
        for (selector, new_name) in &self.mappings {
            let nodes = document.select(selector);
            if nodes.is_empty() {
                continue;
            }
            debug!(
                "Renaming {} element(s) matching {} to {}",
                nodes.len(),
                selector,
                new_name
            );

            let xot = document.xot_mut();
            let name_id = xot.add_name(new_name);
            for node in nodes {
                if let Some(element) = xot.element_mut(node) {
                    element.set_name(name_id);
                }
            }
        }
        Ok(())
    }
}
