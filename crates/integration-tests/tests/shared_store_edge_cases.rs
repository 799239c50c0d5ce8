//! Shared store edge cases
//!
//! Several clients reading and mutating one database, as the venue's
//! screens do.

use std::sync::Arc;
use std::time::Duration;

use arcade_queue_core::application::reaper::partition_elapsed;
use arcade_queue_core::application::{
    project, shutdown_channel, PositionWatcher, QueueFetcher, Reaper,
};
use arcade_queue_core::domain::{Category, NewQueueDocument, WaitAllotment, MILLIS_PER_MINUTE};
use arcade_queue_core::port::id_provider::UuidProvider;
use arcade_queue_core::port::time_provider::mocks::FixedTimeProvider;
use arcade_queue_core::port::QueueStore;
use arcade_queue_infra_sqlite::{create_pool, database_url, run_migrations, SqliteQueueStore};
use tokio::sync::mpsc;

const MIN: i64 = MILLIS_PER_MINUTE;
const T: i64 = 1_704_123_000_000;

async fn open_store(url: &str, clock: Arc<FixedTimeProvider>) -> Arc<SqliteQueueStore> {
    let pool = create_pool(url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteQueueStore::new(pool, clock, Arc::new(UuidProvider)))
}

async fn join(store: &SqliteQueueStore, category: Category, nick: &str, minutes: i64) {
    store
        .insert(NewQueueDocument {
            category,
            wait_time: WaitAllotment::from_minutes(minutes),
            login_nickname: nick.to_string(),
        })
        .await
        .unwrap();
}

/// Two clients reaping the same elapsed entry: the loser sees it already gone
#[tokio::test]
async fn test_racing_reapers_both_succeed() {
    let clock = Arc::new(FixedTimeProvider::new(T));
    let store = open_store(":memory:", clock.clone()).await;
    join(&store, Category::Pcs, "A", 10).await;
    clock.advance(1_000);
    join(&store, Category::Pcs, "B", 5).await;

    // Both clients projected the same snapshot from the same base
    let entries = QueueFetcher::new(store.clone()).fetch(Category::Pcs).await.unwrap();
    let outcome = partition_elapsed(project(entries, T), T + 10 * MIN + 1_000);
    assert_eq!(outcome.removed.len(), 1);

    let reaper_one = Reaper::new(store.clone());
    let reaper_two = Reaper::new(store.clone());
    let (first, second) = tokio::join!(
        reaper_one.delete_removed(&outcome.removed),
        reaper_two.delete_removed(&outcome.removed),
    );

    // "Already gone" is success for whoever loses the race
    assert_eq!((first.0, second.0), (1, 1));
    assert!(first.1.is_empty());
    assert!(second.1.is_empty());

    let remaining = store.query_by_category(Category::Pcs).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].login_nickname, "B");
}

#[tokio::test]
async fn test_reap_is_scoped_to_category() {
    let clock = Arc::new(FixedTimeProvider::new(T));
    let store = open_store(":memory:", clock.clone()).await;
    join(&store, Category::Pcs, "A", 1).await;
    join(&store, Category::Consoles, "A", 1).await;

    let entries = QueueFetcher::new(store.clone()).fetch(Category::Pcs).await.unwrap();
    let report = Reaper::new(store.clone())
        .reap(project(entries, T), T + 2 * MIN)
        .await;

    assert_eq!(report.deleted, 1);
    assert!(report.retained.is_empty());
    assert!(store.query_by_category(Category::Pcs).await.unwrap().is_empty());
    assert_eq!(store.query_by_category(Category::Consoles).await.unwrap().len(), 1);
}

async fn next_position(rx: &mut mpsc::UnboundedReceiver<Option<usize>>) -> Option<usize> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("position update expected")
        .expect("channel open")
}

/// Position updates reach a watcher when another process writes the file
#[tokio::test]
async fn test_position_follows_writes_from_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let url = database_url(dir.path().join("queue.db").to_str().unwrap());
    let clock = Arc::new(FixedTimeProvider::new(T));

    let watcher_store = open_store(&url, clock.clone()).await;
    let writer_store = open_store(&url, clock.clone()).await;

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let relay = watcher_store
        .start_change_relay(Duration::from_millis(20), shutdown_rx)
        .await
        .unwrap();

    let watcher = PositionWatcher::new(
        Arc::new(QueueFetcher::new(watcher_store.clone())),
        watcher_store.clone(),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = watcher.subscribe(Category::Vrs, "B", move |p| {
        let _ = tx.send(p);
    });

    assert_eq!(next_position(&mut rx).await, None);

    // A joining does not change B's (absent) position; only B's own join does
    join(&writer_store, Category::Vrs, "A", 10).await;
    clock.advance(1_000);
    join(&writer_store, Category::Vrs, "B", 10).await;
    assert_eq!(next_position(&mut rx).await, Some(2));

    shutdown_tx.shutdown();
    relay.await.unwrap();
}
