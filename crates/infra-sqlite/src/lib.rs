// Arcade Queue Infrastructure - SQLite Adapter
// Implements: QueueStore, QueueChangeFeed

mod connection;
mod migration;
mod queue_store;

pub use connection::{create_pool, database_url};
pub use migration::run_migrations;
pub use queue_store::SqliteQueueStore;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
