//! Element selectors: the XPath subset used by site configuration.
//!
//! Supported forms:
//!
//! - `//name`: every element called `name`, anywhere in the document
//! - `/page/name`: a path from the document root
//! - `//component/name`, `/page//name`: mixed child and descendant steps
//! - `*`: any element name
//! - `[@attr="value"]` or `[@attr='value']`: attribute equality, repeatable
//!
//! A selector without a leading slash is evaluated from the document node,
//! the same as one with a single leading slash. Names are matched on their
//! local part, so prefixed names (`a:b`) are rejected.

use std::collections::HashSet;
use std::fmt;

use xot::{Node, Xot};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Local(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    name: NameTest,
    predicates: Vec<(String, String)>,
}

/// A compiled element selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSelector {
    source: String,
    steps: Vec<Step>,
}

impl ElementSelector {
    /// Compile a selector expression.
    pub fn parse(source: &str) -> Result<Self> {
        let steps = Parser::new(source).parse()?;
        Ok(Self {
            source: source.to_string(),
            steps,
        })
    }

    /// The expression this selector was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Select matching elements below `context`, in document order.
    pub fn select(&self, xot: &Xot, context: Node) -> Vec<Node> {
        let mut current = vec![context];

        for step in &self.steps {
            let mut next: Vec<Node> = Vec::new();
            let mut seen: HashSet<Node> = HashSet::new();
            for &node in &current {
                let candidates: Vec<Node> = match step.axis {
                    Axis::Child => xot.children(node).collect(),
                    Axis::Descendant => xot.descendants(node).filter(|n| *n != node).collect(),
                };
                for candidate in candidates {
                    if step.matches(xot, candidate) && seen.insert(candidate) {
                        next.push(candidate);
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }

        current
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Step {
    fn matches(&self, xot: &Xot, node: Node) -> bool {
        let element = match xot.element(node) {
            Some(element) => element,
            None => return false,
        };

        if let NameTest::Local(name) = &self.name {
            if xot.local_name_str(element.name()) != name.as_str() {
                return false;
            }
        }

        self.predicates.iter().all(|(attribute, expected)| {
            attribute_value(xot, node, attribute).is_some_and(|value| value == *expected)
        })
    }
}

/// Value of the un-namespaced attribute `name` on `node`.
pub(crate) fn attribute_value(xot: &Xot, node: Node, name: &str) -> Option<String> {
    let name_id = xot.name(name)?;
    xot.attributes(node).get(name_id).map(|value| value.to_string())
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.trim().chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Selector {
            selector: self.source.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse(mut self) -> Result<Vec<Step>> {
        if self.chars.is_empty() {
            return Err(self.error("selector is empty"));
        }

        let mut steps = Vec::new();
        let mut axis = self.parse_axis().unwrap_or(Axis::Child);

        loop {
            steps.push(self.parse_step(axis)?);
            if self.peek().is_none() {
                break;
            }
            axis = match self.parse_axis() {
                Some(axis) => axis,
                None => {
                    return Err(self.error(format!(
                        "unexpected '{}' at position {}",
                        self.chars[self.pos], self.pos
                    )))
                }
            };
        }

        Ok(steps)
    }

    fn parse_axis(&mut self) -> Option<Axis> {
        if self.eat('/') {
            if self.eat('/') {
                Some(Axis::Descendant)
            } else {
                Some(Axis::Child)
            }
        } else {
            None
        }
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step> {
        let name = if self.eat('*') {
            NameTest::Any
        } else {
            let name = self.parse_name();
            if name.is_empty() {
                return Err(self.error(format!("expected element name at position {}", self.pos)));
            }
            self.reject_prefix()?;
            NameTest::Local(name)
        };

        let mut predicates = Vec::new();
        while self.eat('[') {
            predicates.push(self.parse_predicate()?);
        }

        Ok(Step {
            axis,
            name,
            predicates,
        })
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn reject_prefix(&self) -> Result<()> {
        if self.peek() == Some(':') {
            return Err(self.error(format!(
                "namespace prefixes are not supported (position {})",
                self.pos
            )));
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse_predicate(&mut self) -> Result<(String, String)> {
        self.skip_whitespace();
        if !self.eat('@') {
            return Err(self.error("only [@attribute=\"value\"] predicates are supported"));
        }
        let attribute = self.parse_name();
        if attribute.is_empty() {
            return Err(self.error("expected attribute name after '@'"));
        }
        self.reject_prefix()?;
        self.skip_whitespace();
        if !self.eat('=') {
            return Err(self.error(format!("expected '=' after @{}", attribute)));
        }
        self.skip_whitespace();

        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("attribute value must be quoted")),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if !self.eat(quote) {
            return Err(self.error("unterminated attribute value"));
        }
        let value: String = self.chars[start..self.pos - 1].iter().collect();

        self.skip_whitespace();
        if !self.eat(']') {
            return Err(self.error("expected ']' to close predicate"));
        }

        Ok((attribute, value))
    }
}
