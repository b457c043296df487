//! # Repository Sync Engine
//!
//! One sync pass walks every configured site in turn:
//!
//! 1. open the site's working copy, cloning it if there is none,
//! 2. remember `HEAD`, pull, and classify the outcome,
//! 3. on a fast-forward, diff the old and new heads into a [`ChangeSet`]
//!    and run the site's processors on it.
//!
//! Only one pass runs at a time in a process. A pass that finds another one
//! in progress returns immediately instead of waiting; the next trigger
//! picks up whatever it missed, since the diff is always taken against the
//! working copy's own head.
//!
//! A failing site is logged and the pass moves on to the next one.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info};

use crate::changeset::ChangeSet;
use crate::config::{SiteConfig, SiteConfigSource};
use crate::error::Result;
use crate::pipeline::run_pipeline;
use crate::repository::{resolve_or_clone, GitOperations, PullOutcome};

static SYNC_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

/// Proof that this thread holds the process-wide sync lock. Released on drop.
#[derive(Debug)]
pub struct SyncGuard {
    _private: (),
}

impl SyncGuard {
    /// Take the lock if it is free, without waiting.
    pub fn try_acquire() -> Option<SyncGuard> {
        SYNC_IN_PROGRESS
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard { _private: () })
    }

    pub fn is_held() -> bool {
        SYNC_IN_PROGRESS.load(Ordering::Acquire)
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        SYNC_IN_PROGRESS.store(false, Ordering::Release);
    }
}

/// What happened to one site during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteOutcome {
    /// Pulled new commits and ran the pipeline.
    Synced {
        changes: usize,
        processor_failures: usize,
    },
    UpToDate,
    /// The pull needed a merge; nothing was changed or processed.
    Unsupported(String),
    /// The site could not be loaded or synced.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteReport {
    pub site_id: String,
    pub outcome: SiteOutcome,
}

/// Result of one call to [`RepositorySyncEngine::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Disabled,
    /// Another pass held the lock.
    Skipped,
    Completed(Vec<SiteReport>),
}

impl PassOutcome {
    pub fn reports(&self) -> &[SiteReport] {
        match self {
            PassOutcome::Completed(reports) => reports,
            _ => &[],
        }
    }

    /// Whether any site failed outright.
    pub fn has_failures(&self) -> bool {
        self.reports()
            .iter()
            .any(|r| matches!(r.outcome, SiteOutcome::Failed(_)))
    }
}

/// Pulls every configured site and feeds its changes to its processors.
pub struct RepositorySyncEngine {
    enabled: bool,
    sites: Box<dyn SiteConfigSource>,
    git: Box<dyn GitOperations>,
}

impl RepositorySyncEngine {
    pub fn new(sites: Box<dyn SiteConfigSource>, git: Box<dyn GitOperations>) -> Self {
        Self {
            enabled: true,
            sites,
            git,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run one sync pass over every site.
    pub fn execute(&self) -> PassOutcome {
        if !self.enabled {
            debug!("Sync engine disabled, skipping pass");
            return PassOutcome::Disabled;
        }

        let _guard = match SyncGuard::try_acquire() {
            Some(guard) => guard,
            None => {
                info!("Another sync pass is in progress, skipping this one");
                return PassOutcome::Skipped;
            }
        };

        let site_ids = match self.sites.site_ids() {
            Ok(ids) => ids,
            Err(e) => {
                error!("Unable to list configured sites: {}", e);
                return PassOutcome::Completed(Vec::new());
            }
        };

        let mut reports = Vec::with_capacity(site_ids.len());
        for site_id in site_ids {
            let outcome = match self.sync_site_by_id(&site_id) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Error while syncing site {}: {}", site_id, e);
                    SiteOutcome::Failed(e.to_string())
                }
            };
            reports.push(SiteReport { site_id, outcome });
        }

        PassOutcome::Completed(reports)
    }

    fn sync_site_by_id(&self, site_id: &str) -> Result<SiteOutcome> {
        let site = self.sites.load_site(site_id)?;
        self.sync_site(&site)
    }

    /// Sync one site's working copy and process what changed.
    ///
    /// Only called from [`execute`](Self::execute), with the sync lock held.
    fn sync_site(&self, site: &SiteConfig) -> Result<SiteOutcome> {
        let root = site.local_repo_path.as_path();
        resolve_or_clone(self.git.as_ref(), &site.remote_url, root)?;

        let old_head = self.git.resolve_head(root)?;
        debug!("Site {} is at {} before pull", site.id, old_head);

        match self.git.pull(root)? {
            PullOutcome::FastForward(new_head) if new_head != old_head => {
                let entries = self.git.diff(root, &old_head, &new_head)?;
                let change_set = ChangeSet::from_diff(&entries);
                info!(
                    "Site {} fast-forwarded {} -> {}: {}",
                    site.id, old_head, new_head, change_set
                );

                let processor_failures = run_pipeline(&site.processors, site, &change_set);
                Ok(SiteOutcome::Synced {
                    changes: change_set.len(),
                    processor_failures,
                })
            }
            PullOutcome::FastForward(_) | PullOutcome::UpToDate => {
                debug!("Site {} is up to date", site.id);
                Ok(SiteOutcome::UpToDate)
            }
            PullOutcome::Unsupported(reason) => {
                error!(
                    "Pull for site {} needs a merge, which is not supported; skipping: {}",
                    site.id, reason
                );
                Ok(SiteOutcome::Unsupported(reason))
            }
        }
    }
}
