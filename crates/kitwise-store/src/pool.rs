//! # Database Handle
//!
//! Opens the SQLite file that holds catalog snapshots.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new(path) / DbConfig::in_memory()                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await    ← parent dirs, WAL, pool, migrations    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.snapshots()                 ← SqliteCatalogStore over the pool      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The CLI is the only writer and runs one command at a time, so the pool is
//! small. An in-memory database lives exactly as long as its single
//! connection, which is therefore never recycled.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::repository::snapshot::SqliteCatalogStore;

/// Where the database lives and how the pool behaves.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `None` for a private in-memory database.
    pub path: Option<PathBuf>,
    pub pool_size: u32,
    /// How long a writer waits on a locked file before failing.
    pub busy_timeout: Duration,
    /// Apply embedded migrations on open.
    pub migrate: bool,
}

impl DbConfig {
    /// File-backed database; the file and its directory are created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: Some(path.into()),
            pool_size: 2,
            busy_timeout: Duration::from_secs(5),
            migrate: true,
        }
    }

    /// Private in-memory database (tests, `memory`-like dry runs).
    pub fn in_memory() -> Self {
        DbConfig {
            path: None,
            pool_size: 1,
            busy_timeout: Duration::from_secs(1),
            migrate: true,
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn migrate(mut self, migrate: bool) -> Self {
        self.migrate = migrate;
        self
    }

    fn connect_options(&self) -> StoreResult<SqliteConnectOptions> {
        let options = match &self.path {
            Some(path) => {
                ensure_parent_dir(path)?;
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
            }
            None => "sqlite::memory:"
                .parse::<SqliteConnectOptions>()
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?,
        };
        Ok(options.busy_timeout(self.busy_timeout))
    }
}

fn ensure_parent_dir(path: &Path) -> StoreResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            debug!(dir = %parent.display(), "Creating database directory");
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// An open snapshot database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and, if configured, migrates it.
    pub async fn new(config: DbConfig) -> StoreResult<Self> {
        let location = config
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());
        info!(database = %location, "Opening catalog database");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(1);
        if config.path.is_none() {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("{}: {}", location, e)))?;

        let db = Database { pool };
        if config.migrate {
            migrations::run_migrations(&db.pool).await?;
        }

        debug!(database = %location, pool_size = config.pool_size, "Catalog database ready");
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Snapshot store sharing this pool.
    pub fn snapshots(&self) -> SqliteCatalogStore {
        SqliteCatalogStore::new(self.pool.clone())
    }

    /// True if the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    /// Waits for open connections to finish, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
