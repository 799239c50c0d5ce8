// Queue Fetcher - ordered entries for one category from the shared store

use crate::application::constants::DEFAULT_FETCH_TIMEOUT;
use crate::domain::{Category, QueueDocument, QueueEntry, WaitAllotment};
use crate::error::{AppError, Result};
use crate::port::QueueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct QueueFetcher {
    store: Arc<dyn QueueStore>,
    timeout: Duration,
}

impl QueueFetcher {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the queue for `category` in queue order
    ///
    /// Store errors and timeouts become `FetchFailure`. An unparseable wait
    /// time fails the whole fetch with `MalformedWaitAllotment`.
    pub async fn fetch(&self, category: Category) -> Result<Vec<QueueEntry>> {
        let docs = match tokio::time::timeout(self.timeout, self.store.query_by_category(category))
            .await
        {
            Ok(Ok(docs)) => docs,
            Ok(Err(e)) => return Err(AppError::FetchFailure(e.to_string())),
            Err(_) => {
                return Err(AppError::FetchFailure(format!(
                    "query for {} timed out after {:?}",
                    category, self.timeout
                )))
            }
        };

        let mut entries = docs
            .into_iter()
            .map(|doc| to_entry(doc, category))
            .collect::<Result<Vec<_>>>()?;

        // Do not trust server-side ordering
        entries.sort_by(|a, b| {
            a.enqueued_at
                .cmp(&b.enqueued_at)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });

        debug!(category = %category, count = entries.len(), "Fetched queue");
        Ok(entries)
    }
}

fn to_entry(doc: QueueDocument, category: Category) -> Result<QueueEntry> {
    let wait_allotment =
        WaitAllotment::parse(&doc.wait_time).map_err(|_| AppError::MalformedWaitAllotment {
            entry_id: doc.id.clone(),
            value: doc.wait_time.clone(),
        })?;

    Ok(QueueEntry {
        entry_id: doc.id,
        category,
        display_name: doc.login_nickname,
        wait_allotment,
        enqueued_at: doc.created_at,
    })
}
