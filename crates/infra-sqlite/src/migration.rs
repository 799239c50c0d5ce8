// Migration Runner

use arcade_queue_core::error::{AppError, Result};
use sqlx::SqlitePool;
use tracing::info;

const MIGRATIONS: &[(i64, &str, &str)] = &[
    (1, "Queue documents", include_str!("../migrations/001_create_queues.sql")),
    (2, "Change log", include_str!("../migrations/002_change_log.sql")),
];

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await
    .map_err(migration_error)?;

    let current_version: i64 = if table_exists > 0 {
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await
            .map_err(migration_error)?
            .unwrap_or(0)
    } else {
        0
    };

    info!(current_version, "Checking database schema");

    for (version, name, sql) in MIGRATIONS {
        if current_version < *version {
            info!(version, name, "Applying migration");
            apply_migration(pool, sql).await?;
        }
    }

    Ok(())
}

/// Apply a single migration file in one transaction
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(migration_error)?;
    // Trigger bodies contain semicolons; let SQLite split the script
    sqlx::raw_sql(sql)
        .execute(&mut *tx)
        .await
        .map_err(migration_error)?;
    tx.commit().await.map_err(migration_error)?;
    Ok(())
}

fn migration_error(e: sqlx::Error) -> AppError {
    AppError::Database(format!("migration failed: {e}"))
}
