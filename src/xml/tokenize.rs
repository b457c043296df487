//! Tokenized field duplication.
//!
//! Elements flagged with the tokenize attribute get a sibling copy whose name
//! has a literal-field suffix swapped for its analyzed-field counterpart, so
//! `<title_s tokenize="true">` is indexed both as `title_s` and `title_t`.

use log::debug;

use super::selector::ElementSelector;
use super::{element_name, XmlDocument};
use crate::error::{Error, Result};

pub const DEFAULT_TOKENIZE_ATTRIBUTE: &str = "tokenize";

/// Suffix substitutions used when none are configured.
pub fn default_substitutions() -> Vec<(String, String)> {
    vec![
        ("_s".to_string(), "_t".to_string()),
        ("_smv".to_string(), "_tmv".to_string()),
    ]
}

#[derive(Debug, Clone)]
pub struct TokenizeTransform {
    attribute: String,
    substitutions: Vec<(String, String)>,
    selector: ElementSelector,
}

impl Default for TokenizeTransform {
    fn default() -> Self {
        Self {
            attribute: DEFAULT_TOKENIZE_ATTRIBUTE.to_string(),
            substitutions: default_substitutions(),
            selector: flagged_selector(DEFAULT_TOKENIZE_ATTRIBUTE)
                .unwrap_or_else(|_| unreachable!("default tokenize selector is valid")),
        }
    }
}

fn flagged_selector(attribute: &str) -> Result<ElementSelector> {
    ElementSelector::parse(&format!("//*[@{}=\"true\"]", attribute))
}

impl TokenizeTransform {
    /// Build a transform flagging elements by `attribute` and renaming the
    /// copies by `substitutions`, a list of `(suffix, replacement)` pairs.
    pub fn new(attribute: &str, substitutions: Vec<(String, String)>) -> Result<Self> {
        if attribute.trim().is_empty() {
            return Err(Error::config("tokenize attribute must not be empty"));
        }
        if substitutions.iter().any(|(suffix, _)| suffix.is_empty()) {
            return Err(Error::config("tokenize substitution suffix must not be empty"));
        }
        Ok(Self {
            attribute: attribute.to_string(),
            selector: flagged_selector(attribute)?,
            substitutions,
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn substitutions(&self) -> &[(String, String)] {
        &self.substitutions
    }

    pub fn apply(&self, document: &mut XmlDocument) -> Result<()> {
        let flagged = document.select(&self.selector);
        let source = document.source().to_string();
        let xot = document.xot_mut();

        for element in flagged {
            let name = match element_name(xot, element) {
                Some(name) => name,
                None => continue,
            };
            let parent = match xot.parent(element) {
                Some(parent) if xot.element(parent).is_some() => parent,
                _ => continue,
            };

            for (suffix, replacement) in &self.substitutions {
                let stem = match name.strip_suffix(suffix.as_str()) {
                    Some(stem) => stem,
                    None => continue,
                };
                let new_name = format!("{}{}", stem, replacement);
                debug!("Adding tokenized field {} for {}", new_name, name);

                let copy = xot.clone_node(element);
                let name_id = xot.add_name(&new_name);
                if let Some(copy_element) = xot.element_mut(copy) {
                    copy_element.set_name(name_id);
                }
                xot.append(parent, copy)
                    .map_err(|e| Error::xml(source.as_str(), e))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(transform: &TokenizeTransform, xml: &str) -> String {
        let mut document = XmlDocument::parse(xml, "inline").unwrap();
        transform.apply(&mut document).unwrap();
        document.to_xml_string().unwrap()
    }

    #[test]
    fn test_default_rules_append_analyzed_copy() {
        let output = tokenize(
            &TokenizeTransform::default(),
            r#"<page><title_s tokenize="true">Test</title_s><date>d</date></page>"#,
        );

        assert_eq!(
            output,
            r#"<page><title_s tokenize="true">Test</title_s><date>d</date><title_t tokenize="true">Test</title_t></page>"#
        );
    }

    #[test]
    fn test_multi_value_suffix() {
        let output = tokenize(
            &TokenizeTransform::default(),
            r#"<page><tags_smv tokenize="true"><item>a</item></tags_smv></page>"#,
        );

        assert_eq!(
            output,
            r#"<page><tags_smv tokenize="true"><item>a</item></tags_smv><tags_tmv tokenize="true"><item>a</item></tags_tmv></page>"#
        );
    }

    #[test]
    fn test_unflagged_or_unmatched_elements_are_untouched() {
        let source = r#"<page><title_s>a</title_s><body_s tokenize="false">b</body_s><date tokenize="true">c</date></page>"#;
        assert_eq!(tokenize(&TokenizeTransform::default(), source), source);
    }

    #[test]
    fn test_every_matching_rule_fires() {
        let transform = TokenizeTransform::new(
            "tokenize",
            vec![
                ("_s".to_string(), "_t".to_string()),
                ("s".to_string(), "x".to_string()),
            ],
        )
        .unwrap();

        let output = tokenize(&transform, r#"<page><a_s tokenize="true">v</a_s></page>"#);

        assert_eq!(
            output,
            r#"<page><a_s tokenize="true">v</a_s><a_t tokenize="true">v</a_t><a_x tokenize="true">v</a_x></page>"#
        );
    }

    #[test]
    fn test_nested_flagged_element_copy_lands_in_own_parent() {
        let output = tokenize(
            &TokenizeTransform::default(),
            r#"<page><component><name_s tokenize="true">C</name_s></component></page>"#,
        );

        assert_eq!(
            output,
            r#"<page><component><name_s tokenize="true">C</name_s><name_t tokenize="true">C</name_t></component></page>"#
        );
    }

    #[test]
    fn test_custom_attribute() {
        let transform = TokenizeTransform::new("analyze", default_substitutions()).unwrap();
        let output = tokenize(&transform, r#"<page><t_s analyze="true">x</t_s></page>"#);
        assert_eq!(
            output,
            r#"<page><t_s analyze="true">x</t_s><t_t analyze="true">x</t_t></page>"#
        );
        assert_eq!(transform.attribute(), "analyze");
    }

    #[test]
    fn test_root_element_is_not_duplicated() {
        let source = r#"<page_s tokenize="true">x</page_s>"#;
        assert_eq!(tokenize(&TokenizeTransform::default(), source), source);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(TokenizeTransform::new("", default_substitutions()).is_err());
        assert!(TokenizeTransform::new("tokenize", vec![(String::new(), "_t".to_string())]).is_err());
    }
}
