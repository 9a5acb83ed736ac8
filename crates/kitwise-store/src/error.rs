//! # Store Error Types
//!
//! Error types for catalog store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error / io::Error / serde_json::Error / CoreError                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← categorized, with context                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  anyhow::Error (CLI) ← `.context("...")` and printed                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use kitwise_core::CoreError;
use thiserror::Error;

/// Catalog store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing stored where something was required.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Optimistic comparison failed: the stored catalog changed underneath.
    ///
    /// ## When This Occurs
    /// - Two unifications raced against the same store
    /// - The stored snapshot was rewritten by another process
    #[error("Stored catalog changed: expected fingerprint {expected}, found {found}")]
    Conflict { expected: String, found: String },

    /// File system failure (JSON store).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document decoded but is not a valid catalog.
    #[error("Invalid catalog document: {0}")]
    Catalog(#[from] CoreError),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error; `None` is rendered as `<none>`.
    pub fn conflict(expected: Option<&str>, found: Option<&str>) -> Self {
        StoreError::Conflict {
            expected: expected.unwrap_or("<none>").to_string(),
            found: found.unwrap_or("<none>").to_string(),
        }
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → StoreError::NotFound
/// sqlx::Error::Database       → StoreError::QueryFailed
/// sqlx::Error::PoolTimedOut   → StoreError::ConnectionFailed
/// sqlx::Error::PoolClosed     → StoreError::ConnectionFailed
/// Other                       → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::not_found("Snapshot", "latest"),
            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => {
                StoreError::ConnectionFailed("Timed out waiting for a connection".to_string())
            }
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
