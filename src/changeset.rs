//! The created/updated/deleted path triple produced by one sync cycle.

use std::fmt;

use log::debug;

use crate::path::normalize_repo_path;
use crate::repository::{ChangeKind, DiffEntry};

/// Root-relative paths changed by one sync cycle, grouped by kind.
///
/// Every path begins with a separator. A change set is built once per cycle
/// and handed to processors by shared reference; routers that need a subset
/// build a new `ChangeSet` instead of editing the one they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    created: Vec<String>,
    updated: Vec<String>,
    deleted: Vec<String>,
}

impl ChangeSet {
    pub fn new(created: Vec<String>, updated: Vec<String>, deleted: Vec<String>) -> Self {
        Self {
            created,
            updated,
            deleted,
        }
    }

    /// Classify a tree diff.
    ///
    /// Renames become a delete of the old path plus a create of the new one
    /// and are never folded into `updated`, so indexers drop the old document
    /// id. An exact repeat of a path within the same list is ignored.
    pub fn from_diff(entries: &[DiffEntry]) -> Self {
        let mut change_set = ChangeSet::default();

        for entry in entries {
            debug!("Git Diff Entry: {:?}", entry);
            match entry.kind {
                ChangeKind::Add => push_path(&mut change_set.created, entry.new_path.as_deref()),
                ChangeKind::Modify => push_path(&mut change_set.updated, entry.new_path.as_deref()),
                ChangeKind::Delete => push_path(&mut change_set.deleted, entry.old_path.as_deref()),
                ChangeKind::Rename => {
                    push_path(&mut change_set.deleted, entry.old_path.as_deref());
                    push_path(&mut change_set.created, entry.new_path.as_deref());
                }
            }
        }

        change_set
    }

    pub fn created(&self) -> &[String] {
        &self.created
    }

    pub fn updated(&self) -> &[String] {
        &self.updated
    }

    pub fn deleted(&self) -> &[String] {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Total number of paths across the three lists.
    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}

fn push_path(list: &mut Vec<String>, path: Option<&str>) {
    if let Some(path) = path {
        let path = normalize_repo_path(path);
        if !list.contains(&path) {
            list.push(path);
        }
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChangeSet{{created={:?}, updated={:?}, deleted={:?}}}",
            self.created, self.updated, self.deleted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_diff_classifies_each_kind() {
        let entries = vec![
            DiffEntry::added("site/new.xml".to_string()),
            DiffEntry::modified("site/changed.xml".to_string()),
            DiffEntry::deleted("static/old.jpg".to_string()),
        ];

        let change_set = ChangeSet::from_diff(&entries);

        assert_eq!(change_set.created(), paths(&["/site/new.xml"]).as_slice());
        assert_eq!(change_set.updated(), paths(&["/site/changed.xml"]).as_slice());
        assert_eq!(change_set.deleted(), paths(&["/static/old.jpg"]).as_slice());
    }

    #[test]
    fn test_rename_is_delete_plus_create_never_update() {
        let entries = vec![DiffEntry::renamed("old.xml".to_string(), "new.xml".to_string())];

        let change_set = ChangeSet::from_diff(&entries);

        assert_eq!(change_set.created(), paths(&["/new.xml"]).as_slice());
        assert!(change_set.updated().is_empty());
        assert_eq!(change_set.deleted(), paths(&["/old.xml"]).as_slice());
    }

    #[test]
    fn test_from_diff_preserves_input_order() {
        let entries = vec![
            DiffEntry::added("b.xml".to_string()),
            DiffEntry::added("a.xml".to_string()),
            DiffEntry::added("c.xml".to_string()),
        ];

        let change_set = ChangeSet::from_diff(&entries);

        assert_eq!(
            change_set.created(),
            paths(&["/b.xml", "/a.xml", "/c.xml"]).as_slice()
        );
    }

    #[test]
    fn test_from_diff_ignores_exact_duplicates_in_a_list() {
        let entries = vec![
            DiffEntry::added("a.xml".to_string()),
            DiffEntry::added("a.xml".to_string()),
        ];

        assert_eq!(ChangeSet::from_diff(&entries).created().len(), 1);
    }

    #[test]
    fn test_empty_change_set() {
        let change_set = ChangeSet::from_diff(&[]);
        assert!(change_set.is_empty());
        assert_eq!(change_set.len(), 0);
    }

    #[test]
    fn test_display() {
        let change_set = ChangeSet::new(paths(&["/a.xml"]), Vec::new(), paths(&["/b.jpg"]));
        let display = change_set.to_string();
        assert!(display.contains("created=[\"/a.xml\"]"));
        assert!(display.contains("deleted=[\"/b.jpg\"]"));
        assert_eq!(change_set.len(), 2);
    }
}
