//! # Content Deployer Library
//!
//! This library keeps downstream systems (search indexes, caches, scripts,
//! mail recipients) in step with git-backed content repositories. It is used
//! by the `content-deployer` command-line tool but can be embedded in any
//! service that triggers sync passes on its own schedule.
//!
//! ## Quick Example
//!
//! ```
//! use content_deployer::changeset::ChangeSet;
//! use content_deployer::repository::DiffEntry;
//!
//! let diff = vec![
//!     DiffEntry::renamed("old.xml".to_string(), "new.xml".to_string()),
//!     DiffEntry::modified("site/index.xml".to_string()),
//! ];
//! let change_set = ChangeSet::from_diff(&diff);
//!
//! assert_eq!(change_set.created(), &["/new.xml".to_string()]);
//! assert_eq!(change_set.updated(), &["/site/index.xml".to_string()]);
//! assert_eq!(change_set.deleted(), &["/old.xml".to_string()]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Change sets (`changeset`)**: the created/updated/deleted paths of one
//!   sync cycle, built from a git diff.
//! - **Repository access (`repository`, `git`)**: clone, pull and diff
//!   through the system `git` binary, behind a trait for testing.
//! - **Pipeline (`pipeline`)**: ordered processors, path and site routers,
//!   and the registry that builds them from site files.
//! - **Indexing (`indexing`)**: leaves that turn paths into index mutations.
//! - **XML transforms (`xml`)**: include flattening, field renaming and
//!   tokenization applied to content before it is indexed.
//! - **Sites (`config`)**: per-site YAML files.
//!
//! ## Execution Flow
//!
//! [`engine::RepositorySyncEngine::execute`] runs one pass:
//!
//! 1.  **Lock**: skip the pass if another one is running.
//! 2.  **Sync**: for each site, open or clone the working copy and pull.
//! 3.  **Diff**: on a fast-forward, diff the old and new heads.
//! 4.  **Process**: run the site's processors on the resulting change set.

pub mod changeset;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod git;
pub mod indexing;
pub mod path;
pub mod pipeline;
pub mod repository;
pub mod xml;
