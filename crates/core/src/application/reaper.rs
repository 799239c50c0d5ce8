// Elapsed-Entry Reaper
//
// Removes entries whose turn is over from the in-memory view and issues a
// best-effort delete against the shared store. In-memory removal never waits
// on store confirmation: a failed delete is logged and retried implicitly by
// whichever client reaps the entry next.

use crate::application::constants::DEFAULT_FETCH_TIMEOUT;
use crate::domain::{EpochMillis, ProjectedEntry};
use crate::error::AppError;
use crate::port::QueueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of partitioning a projected queue
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReapOutcome {
    /// Entries still waiting or playing, in queue order
    pub retained: Vec<ProjectedEntry>,
    /// Elapsed entries, in queue order
    pub removed: Vec<ProjectedEntry>,
}

/// Whether an entry's turn is over at `now`
pub fn is_elapsed(entry: &ProjectedEntry, now: EpochMillis) -> bool {
    entry.projected_end() <= now
}

/// Split `projected` into retained and elapsed entries (order preserving)
pub fn partition_elapsed(projected: Vec<ProjectedEntry>, now: EpochMillis) -> ReapOutcome {
    let (removed, retained): (Vec<_>, Vec<_>) = projected
        .into_iter()
        .partition(|entry| is_elapsed(entry, now));
    ReapOutcome { retained, removed }
}

/// Reap pass summary
#[derive(Debug)]
pub struct ReapReport {
    pub retained: Vec<ProjectedEntry>,
    pub removed: Vec<ProjectedEntry>,
    /// Deletes the store confirmed (including already-gone documents)
    pub deleted: usize,
    /// Deletes that failed; the entries are gone from the view regardless
    pub delete_failures: Vec<AppError>,
}

pub struct Reaper {
    store: Arc<dyn QueueStore>,
    delete_timeout: Duration,
}

impl Reaper {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self {
            store,
            delete_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_delete_timeout(mut self, timeout: Duration) -> Self {
        self.delete_timeout = timeout;
        self
    }

    /// Partition and delete every elapsed entry from the store
    pub async fn reap(&self, projected: Vec<ProjectedEntry>, now: EpochMillis) -> ReapReport {
        let ReapOutcome { retained, removed } = partition_elapsed(projected, now);
        let (deleted, delete_failures) = self.delete_removed(&removed).await;
        ReapReport {
            retained,
            removed,
            deleted,
            delete_failures,
        }
    }

    /// Issue a store delete for each removed entry, in order
    ///
    /// Returns the confirmed delete count and the failures.
    pub async fn delete_removed(&self, removed: &[ProjectedEntry]) -> (usize, Vec<AppError>) {
        let mut deleted = 0;
        let mut failures = Vec::new();

        for entry in removed {
            match self.delete(entry.entry_id()).await {
                Ok(existed) => {
                    deleted += 1;
                    if existed {
                        info!(
                            entry_id = %entry.entry_id(),
                            nickname = %entry.entry.display_name,
                            "Removed elapsed entry from store"
                        );
                    } else {
                        // Another client got there first
                        debug!(entry_id = %entry.entry_id(), "Elapsed entry already gone");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to delete elapsed entry");
                    failures.push(e);
                }
            }
        }

        (deleted, failures)
    }

    async fn delete(&self, entry_id: &str) -> Result<bool, AppError> {
        let failure = |reason: String| AppError::DeleteFailure {
            entry_id: entry_id.to_string(),
            reason,
        };
        match tokio::time::timeout(self.delete_timeout, self.store.delete(entry_id)).await {
            Ok(Ok(existed)) => Ok(existed),
            Ok(Err(e)) => Err(failure(e.to_string())),
            Err(_) => Err(failure(format!("timed out after {:?}", self.delete_timeout))),
        }
    }
}
