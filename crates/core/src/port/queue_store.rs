// Queue Store Port (Interface)
//
// The shared document store every client reads and mutates. Consistency is
// eventual: a delete by one client may not be visible to another client's
// concurrent read.

use crate::domain::{Category, EntryId, NewQueueDocument, QueueDocument};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Repository interface for queue documents
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// All documents for a category, ordered by `created_at` ascending
    async fn query_by_category(&self, category: Category) -> Result<Vec<QueueDocument>>;

    /// Delete by id. Returns false when the document was already gone.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Insert a new document; the store assigns `id` and `created_at`
    async fn insert(&self, doc: NewQueueDocument) -> Result<QueueDocument>;
}

/// What happened to a queue document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Deleted,
}

/// Store mutation notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueChange {
    pub category: Category,
    pub entry_id: EntryId,
    pub kind: ChangeKind,
}

/// Push-based change notifications from the store
pub trait QueueChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<QueueChange>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::{IdProvider, TimeProvider};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory store with failure injection
    ///
    /// Returns documents in insertion order (it does not sort), so callers
    /// relying on order must sort themselves.
    pub struct InMemoryQueueStore {
        docs: Mutex<Vec<QueueDocument>>,
        deleted: Mutex<Vec<EntryId>>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        fail_queries: AtomicBool,
        fail_deletes: AtomicBool,
        query_delay_ms: AtomicU64,
        query_count: AtomicU64,
        changes: broadcast::Sender<QueueChange>,
    }

    impl InMemoryQueueStore {
        pub fn new(time_provider: Arc<dyn TimeProvider>, id_provider: Arc<dyn IdProvider>) -> Self {
            let (changes, _) = broadcast::channel(64);
            Self {
                docs: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
                time_provider,
                id_provider,
                fail_queries: AtomicBool::new(false),
                fail_deletes: AtomicBool::new(false),
                query_delay_ms: AtomicU64::new(0),
                query_count: AtomicU64::new(0),
                changes,
            }
        }

        /// Push a document verbatim (no id/timestamp assignment)
        pub fn insert_raw(&self, doc: QueueDocument) {
            self.docs.lock().unwrap().push(doc);
        }

        pub fn set_fail_queries(&self, fail: bool) {
            self.fail_queries.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_deletes(&self, fail: bool) {
            self.fail_deletes.store(fail, Ordering::SeqCst);
        }

        pub fn set_query_delay(&self, delay: Duration) {
            self.query_delay_ms
                .store(delay.as_millis() as u64, Ordering::SeqCst);
        }

        pub fn query_count(&self) -> u64 {
            self.query_count.load(Ordering::SeqCst)
        }

        /// IDs successfully deleted so far
        pub fn deleted_ids(&self) -> Vec<EntryId> {
            self.deleted.lock().unwrap().clone()
        }

        pub fn ids(&self) -> Vec<EntryId> {
            self.docs
                .lock()
                .unwrap()
                .iter()
                .map(|d| d.id.clone())
                .collect()
        }

        pub fn len(&self) -> usize {
            self.docs.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl QueueStore for InMemoryQueueStore {
        async fn query_by_category(&self, category: Category) -> Result<Vec<QueueDocument>> {
            self.query_count.fetch_add(1, Ordering::SeqCst);

            let delay = self.query_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(AppError::Database("connection lost".to_string()));
            }

            Ok(self
                .docs
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.category == category.as_str())
                .cloned()
                .collect())
        }

        async fn delete(&self, id: &str) -> Result<bool> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(AppError::Database("delete rejected".to_string()));
            }

            let removed = {
                let mut docs = self.docs.lock().unwrap();
                let pos = docs.iter().position(|d| d.id == id);
                pos.map(|i| docs.remove(i))
            };

            match removed {
                Some(doc) => {
                    self.deleted.lock().unwrap().push(doc.id.clone());
                    if let Ok(category) = doc.category.parse() {
                        let _ = self.changes.send(QueueChange {
                            category,
                            entry_id: doc.id,
                            kind: ChangeKind::Deleted,
                        });
                    }
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn insert(&self, doc: NewQueueDocument) -> Result<QueueDocument> {
            let stored = QueueDocument {
                id: self.id_provider.generate_id(),
                category: doc.category.as_str().to_string(),
                wait_time: doc.wait_time.to_string(),
                created_at: self.time_provider.now_millis(),
                login_nickname: doc.login_nickname,
            };
            self.docs.lock().unwrap().push(stored.clone());
            let _ = self.changes.send(QueueChange {
                category: doc.category,
                entry_id: stored.id.clone(),
                kind: ChangeKind::Inserted,
            });
            Ok(stored)
        }
    }

    impl QueueChangeFeed for InMemoryQueueStore {
        fn subscribe(&self) -> broadcast::Receiver<QueueChange> {
            self.changes.subscribe()
        }
    }
}
