//! Conditional routers: path-pattern and per-site dispatch.

use std::collections::BTreeMap;

use log::debug;
use regex::Regex;

use super::Processor;
use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::path::{compile_patterns, matches_any};

/// One entry of a [`PathPatternRouter`]: a pattern set and its delegate.
pub struct PathMapping {
    patterns: Vec<Regex>,
    processor: Processor,
}

impl PathMapping {
    /// Patterns are full-match, case-sensitive regular expressions.
    pub fn new(patterns: &[String], processor: Processor) -> Result<Self> {
        Ok(Self {
            patterns: compile_patterns(patterns)?,
            processor,
        })
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }
}

/// Splits a change set between delegates by path pattern.
///
/// Mappings are tried in order and each path goes to the first mapping with
/// a matching pattern; a path no mapping matches is dropped. A delegate only
/// runs if it claimed at least one path, and only sees the paths it claimed,
/// deletes included.
pub struct PathPatternRouter {
    mappings: Vec<PathMapping>,
}

impl PathPatternRouter {
    pub fn new(mappings: Vec<PathMapping>) -> Self {
        Self { mappings }
    }

    pub fn delegates(&self) -> impl Iterator<Item = &Processor> {
        self.mappings.iter().map(PathMapping::processor)
    }

    /// Partition `change_set` among the mappings, returning one change set per
    /// mapping (empty when it claimed nothing). Does not run anything.
    pub fn route(&self, change_set: &ChangeSet) -> Vec<ChangeSet> {
        let mut created = change_set.created().to_vec();
        let mut updated = change_set.updated().to_vec();
        let mut deleted = change_set.deleted().to_vec();

        self.mappings
            .iter()
            .map(|mapping| {
                ChangeSet::new(
                    claim(&mut created, &mapping.patterns),
                    claim(&mut updated, &mapping.patterns),
                    claim(&mut deleted, &mapping.patterns),
                )
            })
            .collect()
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        for (mapping, claimed) in self.mappings.iter().zip(self.route(change_set)) {
            if claimed.is_empty() {
                continue;
            }
            debug!(
                "Executing processor {} for {}",
                mapping.processor.name(),
                claimed
            );
            mapping.processor.process(site, &claimed)?;
        }
        Ok(())
    }
}

/// Move every path matching `patterns` out of `remaining`, keeping order.
fn claim(remaining: &mut Vec<String>, patterns: &[Regex]) -> Vec<String> {
    let (claimed, rest): (Vec<String>, Vec<String>) = remaining
        .drain(..)
        .partition(|path| matches_any(path, patterns));
    *remaining = rest;
    claimed
}

/// Dispatches to the delegate mapped to the site id, or to the default.
///
/// Exactly one delegate runs, or none when the site is unmapped and there is
/// no default.
pub struct PerSiteRouter {
    mappings: BTreeMap<String, Processor>,
    default: Option<Box<Processor>>,
}

impl PerSiteRouter {
    pub fn new(mappings: BTreeMap<String, Processor>, default: Option<Processor>) -> Self {
        Self {
            mappings,
            default: default.map(Box::new),
        }
    }

    pub fn delegates(&self) -> impl Iterator<Item = &Processor> {
        self.mappings.values().chain(self.default.as_deref())
    }

    /// The delegate that would run for `site_id`.
    pub fn select(&self, site_id: &str) -> Option<&Processor> {
        self.mappings
            .get(site_id)
            .or(self.default.as_deref())
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        match self.select(&site.id) {
            Some(processor) => {
                debug!(
                    "Executing processor {} for site {}",
                    processor.name(),
                    site.id
                );
                processor.process(site, change_set)
            }
            None => {
                debug!("No processor mapped for site {}", site.id);
                Ok(())
            }
        }
    }
}
