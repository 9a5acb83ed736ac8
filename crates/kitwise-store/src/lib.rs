//! # kitwise-store: Catalog Store for Kitwise
//!
//! Persists the unified catalog produced by `kitwise-core` and keeps an
//! explicit in-memory copy of it for the current process.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kitwise Data Flow                                │
//! │                                                                         │
//! │  kitwise unify ──► UnifiedCatalog                                       │
//! │                         │                                               │
//! │                         ▼                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  kitwise-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   CachedCatalogStore ──► MemoryCatalogStore (cache)             │   │
//! │  │          │                                                      │   │
//! │  │          ▼                                                      │   │
//! │  │   SqliteCatalogStore  │  JsonFileCatalogStore                   │   │
//! │  │   (catalog_snapshots) │  (kitwise-catalog.json)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                         │                                               │
//! │                         ▼                                               │
//! │  kitwise decompose ◄── load()                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - `CatalogStore` trait, memory store, cache wrapper
//! - [`file`] - JSON document store
//! - [`pool`] - SQLite connection pool
//! - [`migrations`] - Embedded migrations
//! - [`repository`] - SQLite snapshot store
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kitwise_store::{CatalogStore, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kitwise.db")).await?;
//! let store = db.snapshots();
//!
//! if store.is_stale(&catalog.composition_fingerprint).await? {
//!     store.save(&catalog).await?;
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod file;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use file::JsonFileCatalogStore;
pub use pool::{Database, DbConfig};
pub use repository::snapshot::{SnapshotInfo, SqliteCatalogStore};
pub use store::{AnyCatalogStore, CachedCatalogStore, CatalogStore, MemoryCatalogStore};
