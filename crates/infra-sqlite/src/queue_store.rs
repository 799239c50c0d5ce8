// SQLite QueueStore Implementation

use arcade_queue_core::application::ShutdownToken;
use arcade_queue_core::application::constants::CHANGE_FEED_CAPACITY;
use arcade_queue_core::domain::{Category, NewQueueDocument, QueueDocument};
use arcade_queue_core::error::{AppError, Result};
use arcade_queue_core::port::{
    ChangeKind, IdProvider, QueueChange, QueueChangeFeed, QueueStore, TimeProvider,
};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Rows read from the change log per relay pass
const CHANGE_BATCH: i64 = 256;

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "2067" | "1555" => {
                    AppError::Conflict(format!("Unique constraint violation: {}", db_err.message()))
                }
                "5" => AppError::Database(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                other => AppError::Database(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Database(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::PoolTimedOut => AppError::Database("Connection pool timed out".to_string()),
        _ => AppError::Database(err.to_string()),
    }
}

pub struct SqliteQueueStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    changes: broadcast::Sender<QueueChange>,
}

impl SqliteQueueStore {
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            pool,
            time_provider,
            id_provider,
            changes,
        }
    }

    /// Tail the change log and publish every store mutation to subscribers
    ///
    /// Covers writes from other processes sharing the database file, which
    /// is what makes [`QueueChangeFeed`] a snapshot listener rather than a
    /// local echo. Only changes committed after this call are relayed.
    /// Without the relay, subscribers still see this store's own writes;
    /// with it, those writes arrive twice (subscribers re-query on change).
    pub async fn start_change_relay(
        &self,
        poll_interval: Duration,
        mut shutdown: ShutdownToken,
    ) -> Result<JoinHandle<()>> {
        let mut cursor: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM queue_changes")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let pool = self.pool.clone();
        let changes = self.changes.clone();

        Ok(tokio::spawn(async move {
            let mut tick = tokio::time::interval(poll_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = shutdown.wait() => break,
                }

                match read_changes(&pool, cursor).await {
                    Ok(rows) => {
                        for row in rows {
                            cursor = row.seq;
                            if let Some(change) = row.into_change() {
                                // No subscribers is fine
                                let _ = changes.send(change);
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "Change relay read failed"),
                }
            }
            debug!("Change relay stopped");
        }))
    }

    /// Drop change log rows older than `max_age`
    pub async fn prune_change_log(&self, max_age: Duration) -> Result<u64> {
        let cutoff = self.time_provider.now_millis() - max_age.as_millis() as i64;
        let result = sqlx::query("DELETE FROM queue_changes WHERE changed_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn query_by_category(&self, category: Category) -> Result<Vec<QueueDocument>> {
        let rows = sqlx::query_as::<_, QueueRow>(
            r#"
            SELECT id, category, wait_time, created_at, login_nickname
            FROM queues
            WHERE category = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(QueueRow::into_document).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let category: Option<String> =
            sqlx::query_scalar("DELETE FROM queues WHERE id = ? RETURNING category")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let Some(category) = category else {
            return Ok(false);
        };
        if let Ok(category) = Category::from_str(&category) {
            let _ = self.changes.send(QueueChange {
                category,
                entry_id: id.to_string(),
                kind: ChangeKind::Deleted,
            });
        }
        Ok(true)
    }

    async fn insert(&self, doc: NewQueueDocument) -> Result<QueueDocument> {
        let stored = QueueDocument {
            id: self.id_provider.generate_id(),
            category: doc.category.as_str().to_string(),
            wait_time: doc.wait_time.to_string(),
            created_at: self.time_provider.now_millis(),
            login_nickname: doc.login_nickname,
        };

        sqlx::query(
            r#"
            INSERT INTO queues (id, category, wait_time, created_at, login_nickname)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.category)
        .bind(&stored.wait_time)
        .bind(stored.created_at)
        .bind(&stored.login_nickname)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let _ = self.changes.send(QueueChange {
            category: doc.category,
            entry_id: stored.id.clone(),
            kind: ChangeKind::Inserted,
        });
        Ok(stored)
    }
}

impl QueueChangeFeed for SqliteQueueStore {
    fn subscribe(&self) -> broadcast::Receiver<QueueChange> {
        self.changes.subscribe()
    }
}

async fn read_changes(pool: &SqlitePool, after: i64) -> Result<Vec<ChangeRow>> {
    sqlx::query_as::<_, ChangeRow>(
        r#"
        SELECT seq, category, entry_id, kind
        FROM queue_changes
        WHERE seq > ?
        ORDER BY seq ASC
        LIMIT ?
        "#,
    )
    .bind(after)
    .bind(CHANGE_BATCH)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: String,
    category: String,
    wait_time: String,
    created_at: i64,
    login_nickname: String,
}

impl QueueRow {
    fn into_document(self) -> QueueDocument {
        QueueDocument {
            id: self.id,
            category: self.category,
            wait_time: self.wait_time,
            created_at: self.created_at,
            login_nickname: self.login_nickname,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChangeRow {
    seq: i64,
    category: String,
    entry_id: String,
    kind: String,
}

impl ChangeRow {
    fn into_change(self) -> Option<QueueChange> {
        let category = match Category::from_str(&self.category) {
            Ok(category) => category,
            Err(_) => {
                debug!(category = %self.category, "Skipping change for unknown category");
                return None;
            }
        };
        let kind = match self.kind.as_str() {
            "INSERTED" => ChangeKind::Inserted,
            "DELETED" => ChangeKind::Deleted,
            _ => return None,
        };
        Some(QueueChange {
            category,
            entry_id: self.entry_id,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use arcade_queue_core::application::shutdown_channel;
    use arcade_queue_core::domain::WaitAllotment;
    use arcade_queue_core::port::id_provider::mocks::SequentialIdProvider;
    use arcade_queue_core::port::time_provider::mocks::FixedTimeProvider;

    async fn setup_test_store() -> (SqliteQueueStore, Arc<FixedTimeProvider>) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let clock = Arc::new(FixedTimeProvider::new(1_000));
        let store = SqliteQueueStore::new(
            pool,
            clock.clone(),
            Arc::new(SequentialIdProvider::default()),
        );
        (store, clock)
    }

    fn new_doc(category: Category, nick: &str, minutes: i64) -> NewQueueDocument {
        NewQueueDocument {
            category,
            wait_time: WaitAllotment::from_minutes(minutes),
            login_nickname: nick.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_query() {
        let (store, _clock) = setup_test_store().await;

        let doc = store.insert(new_doc(Category::Pcs, "ana", 75)).await.unwrap();
        assert_eq!(doc.id, "entry-1");
        assert_eq!(doc.wait_time, "01:15");
        assert_eq!(doc.created_at, 1_000);

        let docs = store.query_by_category(Category::Pcs).await.unwrap();
        assert_eq!(docs, vec![doc]);
        assert!(store.query_by_category(Category::Vrs).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_orders_by_created_at() {
        let (store, clock) = setup_test_store().await;

        clock.set(3_000);
        store.insert(new_doc(Category::Consoles, "late", 5)).await.unwrap();
        clock.set(2_000);
        store.insert(new_doc(Category::Consoles, "early", 5)).await.unwrap();

        let docs = store.query_by_category(Category::Consoles).await.unwrap();
        let nicks: Vec<_> = docs.iter().map(|d| d.login_nickname.as_str()).collect();
        assert_eq!(nicks, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_delete_reports_already_gone() {
        let (store, _clock) = setup_test_store().await;
        let doc = store.insert(new_doc(Category::Pcs, "ana", 5)).await.unwrap();

        assert!(store.delete(&doc.id).await.unwrap());
        assert!(!store.delete(&doc.id).await.unwrap());
        assert!(store.query_by_category(Category::Pcs).await.unwrap().is_empty());
    }

    async fn next_change(changes: &mut broadcast::Receiver<QueueChange>) -> QueueChange {
        tokio::time::timeout(Duration::from_secs(2), changes.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_own_writes_reach_subscribers_without_relay() {
        let (store, _clock) = setup_test_store().await;
        let mut changes = store.subscribe();

        let doc = store.insert(new_doc(Category::Pcs, "ana", 5)).await.unwrap();
        let inserted = next_change(&mut changes).await;
        assert_eq!(inserted.kind, ChangeKind::Inserted);
        assert_eq!(inserted.category, Category::Pcs);
        assert_eq!(inserted.entry_id, doc.id);

        store.delete(&doc.id).await.unwrap();
        let deleted = next_change(&mut changes).await;
        assert_eq!(deleted.kind, ChangeKind::Deleted);
        assert_eq!(deleted.category, Category::Pcs);

        // Deleting what is already gone publishes nothing
        assert!(!store.delete(&doc.id).await.unwrap());
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_change_relay_publishes_foreign_writes() {
        let (store, _clock) = setup_test_store().await;
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let mut changes = store.subscribe();
        let relay = store
            .start_change_relay(Duration::from_millis(10), shutdown_rx)
            .await
            .unwrap();

        // Another process writing to the same file bypasses this store
        sqlx::query(
            "INSERT INTO queues (id, category, wait_time, created_at, login_nickname) VALUES ('x-1', 'Simuladores', '00:05', 1, 'ana')",
        )
        .execute(&store.pool)
        .await
        .unwrap();
        sqlx::query("DELETE FROM queues WHERE id = 'x-1'")
            .execute(&store.pool)
            .await
            .unwrap();

        let first = next_change(&mut changes).await;
        assert_eq!(first.kind, ChangeKind::Inserted);
        assert_eq!(first.category, Category::Simuladores);
        assert_eq!(first.entry_id, "x-1");

        let second = next_change(&mut changes).await;
        assert_eq!(second.kind, ChangeKind::Deleted);
        assert_eq!(second.entry_id, "x-1");

        shutdown_tx.shutdown();
        relay.await.unwrap();
    }

    #[tokio::test]
    async fn test_prune_change_log() {
        let (store, clock) = setup_test_store().await;
        store.insert(new_doc(Category::Pcs, "ana", 5)).await.unwrap();

        // Trigger timestamps come from SQLite's clock, far past this fixed clock
        clock.set(i64::MAX / 2);
        let pruned = store.prune_change_log(Duration::from_secs(60)).await.unwrap();
        assert_eq!(pruned, 1);
    }
}
