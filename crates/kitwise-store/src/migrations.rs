//! # Snapshot Schema Migrations
//!
//! SQL files under `migrations/sqlite/` are compiled into the binary, so a
//! fresh `kitwise.db` is created with the current schema on first open.
//!
//! New schema changes go in a new `NNN_description.sql` file; applied files
//! are checksummed by sqlx and must not be edited.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::StoreResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations. Safe to call on every open.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    let (total, applied) = migration_status(pool).await?;
    if total == applied {
        debug!(applied, "Snapshot schema up to date");
        return Ok(());
    }

    MIGRATOR.run(pool).await?;
    info!(from = applied, to = total, "Snapshot schema migrated");
    Ok(())
}

/// `(embedded, applied)` migration counts.
///
/// A database that was never migrated has no bookkeeping table and reports
/// zero applied.
pub async fn migration_status(pool: &SqlitePool) -> StoreResult<(usize, usize)> {
    let embedded = MIGRATOR.iter().count();

    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if has_table == 0 {
        return Ok((embedded, 0));
    }

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((embedded, usize::try_from(applied).unwrap_or(0)))
}
