// Position Subscription - push-based "where am I in line" feed
//
// Independent of the polling pipeline: driven by store change notifications
// instead of a timer. Both paths may be active on the same queue at once.

use crate::application::fetcher::QueueFetcher;
use crate::domain::Category;
use crate::port::QueueChangeFeed;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Active subscription; dropping it unsubscribes
pub struct PositionSubscription {
    handle: JoinHandle<()>,
}

impl PositionSubscription {
    pub fn unsubscribe(self) {
        // Drop aborts the task
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PositionSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct PositionWatcher {
    fetcher: Arc<QueueFetcher>,
    feed: Arc<dyn QueueChangeFeed>,
}

impl PositionWatcher {
    pub fn new(fetcher: Arc<QueueFetcher>, feed: Arc<dyn QueueChangeFeed>) -> Self {
        Self { fetcher, feed }
    }

    /// Subscribe to `nickname`'s 1-based position in `category`
    ///
    /// `callback` receives the current position once, then again every time
    /// it changes. `None` means the user is not queued.
    pub fn subscribe<F>(
        &self,
        category: Category,
        nickname: impl Into<String>,
        callback: F,
    ) -> PositionSubscription
    where
        F: Fn(Option<usize>) + Send + 'static,
    {
        let nickname = nickname.into();
        let fetcher = Arc::clone(&self.fetcher);
        // Subscribe before the first fetch so no change slips in between
        let mut changes = self.feed.subscribe();

        let handle = tokio::spawn(async move {
            let mut last: Option<Option<usize>> = None;

            loop {
                match fetcher.fetch(category).await {
                    Ok(entries) => {
                        let position = entries
                            .iter()
                            .position(|e| e.is_owned_by(&nickname))
                            .map(|i| i + 1);
                        if last != Some(position) {
                            debug!(category = %category, nickname = %nickname, ?position, "Position changed");
                            last = Some(position);
                            callback(position);
                        }
                    }
                    Err(e) => {
                        warn!(category = %category, error = %e, "Position refresh failed");
                    }
                }

                // Wait for a change that concerns this category
                loop {
                    match changes.recv().await {
                        Ok(change) if change.category == category => break,
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Position feed lagged, refreshing");
                            break;
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            }
        });

        PositionSubscription { handle }
    }
}
