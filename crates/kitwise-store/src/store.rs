//! # Catalog Store
//!
//! The persistence seam for the unified catalog, plus the explicit cache
//! object that stands in for any process-wide "last catalog" state.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         trait CatalogStore                              │
//! │        load • save • fingerprint • clear                                │
//! │        is_stale • save_if_unchanged (provided)                          │
//! │                                                                         │
//! │  MemoryCatalogStore     Arc<RwLock<Option<UnifiedCatalog>>>             │
//! │  JsonFileCatalogStore   one document per file, temp + rename            │
//! │  SqliteCatalogStore     catalog_snapshots table, replaced wholesale     │
//! │  CachedCatalogStore<S>  S + MemoryCatalogStore (read/write-through)     │
//! │  AnyCatalogStore        runtime choice between the above                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Writers are not serialized across processes. `save_if_unchanged` gives
//! callers an optimistic fingerprint check before overwriting; plain `save`
//! is last-writer-wins.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use kitwise_core::UnifiedCatalog;

use crate::error::{StoreError, StoreResult};
use crate::file::JsonFileCatalogStore;
use crate::repository::snapshot::SqliteCatalogStore;

// =============================================================================
// Trait
// =============================================================================

/// Storage for one unified catalog snapshot.
#[allow(async_fn_in_trait)]
pub trait CatalogStore {
    /// The stored catalog, if any.
    async fn load(&self) -> StoreResult<Option<UnifiedCatalog>>;

    /// Replaces the stored catalog.
    async fn save(&self, catalog: &UnifiedCatalog) -> StoreResult<()>;

    /// Composition fingerprint of the stored catalog, if any.
    async fn fingerprint(&self) -> StoreResult<Option<String>>;

    /// Removes the stored catalog. No-op when empty.
    async fn clear(&self) -> StoreResult<()>;

    /// True when nothing is stored or the stored fingerprint differs.
    async fn is_stale(&self, fingerprint: &str) -> StoreResult<bool> {
        Ok(self.fingerprint().await?.as_deref() != Some(fingerprint))
    }

    /// Saves only if the stored fingerprint still equals `expected`.
    ///
    /// `expected = None` means "nothing must be stored yet".
    async fn save_if_unchanged(
        &self,
        catalog: &UnifiedCatalog,
        expected: Option<&str>,
    ) -> StoreResult<()> {
        let current = self.fingerprint().await?;
        if current.as_deref() != expected {
            return Err(StoreError::conflict(expected, current.as_deref()));
        }
        self.save(catalog).await
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process catalog holder. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    slot: Arc<RwLock<Option<UnifiedCatalog>>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with a catalog.
    pub fn with_catalog(catalog: UnifiedCatalog) -> Self {
        MemoryCatalogStore {
            slot: Arc::new(RwLock::new(Some(catalog))),
        }
    }

    /// True if a catalog is held.
    pub async fn is_populated(&self) -> bool {
        self.slot.read().await.is_some()
    }
}

impl CatalogStore for MemoryCatalogStore {
    async fn load(&self) -> StoreResult<Option<UnifiedCatalog>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, catalog: &UnifiedCatalog) -> StoreResult<()> {
        *self.slot.write().await = Some(catalog.clone());
        Ok(())
    }

    async fn fingerprint(&self) -> StoreResult<Option<String>> {
        Ok(self
            .slot
            .read()
            .await
            .as_ref()
            .map(|c| c.composition_fingerprint.clone()))
    }

    async fn clear(&self) -> StoreResult<()> {
        *self.slot.write().await = None;
        Ok(())
    }

    // Check and write under one lock so concurrent callers cannot interleave.
    async fn save_if_unchanged(
        &self,
        catalog: &UnifiedCatalog,
        expected: Option<&str>,
    ) -> StoreResult<()> {
        let mut slot = self.slot.write().await;
        let current = slot.as_ref().map(|c| c.composition_fingerprint.as_str());
        if current != expected {
            return Err(StoreError::conflict(expected, current));
        }
        *slot = Some(catalog.clone());
        Ok(())
    }
}

// =============================================================================
// Cached Store
// =============================================================================

/// Read-through / write-through cache in front of another store.
#[derive(Debug, Clone)]
pub struct CachedCatalogStore<S> {
    inner: S,
    cache: MemoryCatalogStore,
}

impl<S: CatalogStore> CachedCatalogStore<S> {
    pub fn new(inner: S) -> Self {
        CachedCatalogStore {
            inner,
            cache: MemoryCatalogStore::new(),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drops the cached copy; the next load reads through.
    pub async fn invalidate(&self) -> StoreResult<()> {
        self.cache.clear().await
    }
}

impl<S: CatalogStore> CatalogStore for CachedCatalogStore<S> {
    async fn load(&self) -> StoreResult<Option<UnifiedCatalog>> {
        if let Some(hit) = self.cache.load().await? {
            debug!("Catalog served from cache");
            return Ok(Some(hit));
        }

        let loaded = self.inner.load().await?;
        if let Some(catalog) = &loaded {
            self.cache.save(catalog).await?;
        }
        Ok(loaded)
    }

    async fn save(&self, catalog: &UnifiedCatalog) -> StoreResult<()> {
        self.inner.save(catalog).await?;
        self.cache.save(catalog).await
    }

    async fn fingerprint(&self) -> StoreResult<Option<String>> {
        match self.cache.fingerprint().await? {
            Some(fp) => Ok(Some(fp)),
            None => self.inner.fingerprint().await,
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        self.inner.clear().await?;
        self.cache.clear().await
    }

    // The inner store is the source of truth for the comparison.
    async fn save_if_unchanged(
        &self,
        catalog: &UnifiedCatalog,
        expected: Option<&str>,
    ) -> StoreResult<()> {
        self.inner.save_if_unchanged(catalog, expected).await?;
        self.cache.save(catalog).await
    }
}

// =============================================================================
// Runtime Dispatch
// =============================================================================

/// A store chosen at runtime (from configuration).
#[derive(Debug, Clone)]
pub enum AnyCatalogStore {
    Memory(MemoryCatalogStore),
    Json(JsonFileCatalogStore),
    Sqlite(SqliteCatalogStore),
}

impl AnyCatalogStore {
    /// Short backend name for logs and status output.
    pub fn backend_name(&self) -> &'static str {
        match self {
            AnyCatalogStore::Memory(_) => "memory",
            AnyCatalogStore::Json(_) => "json",
            AnyCatalogStore::Sqlite(_) => "sqlite",
        }
    }
}

impl CatalogStore for AnyCatalogStore {
    async fn load(&self) -> StoreResult<Option<UnifiedCatalog>> {
        match self {
            AnyCatalogStore::Memory(s) => s.load().await,
            AnyCatalogStore::Json(s) => s.load().await,
            AnyCatalogStore::Sqlite(s) => s.load().await,
        }
    }

    async fn save(&self, catalog: &UnifiedCatalog) -> StoreResult<()> {
        match self {
            AnyCatalogStore::Memory(s) => s.save(catalog).await,
            AnyCatalogStore::Json(s) => s.save(catalog).await,
            AnyCatalogStore::Sqlite(s) => s.save(catalog).await,
        }
    }

    async fn fingerprint(&self) -> StoreResult<Option<String>> {
        match self {
            AnyCatalogStore::Memory(s) => s.fingerprint().await,
            AnyCatalogStore::Json(s) => s.fingerprint().await,
            AnyCatalogStore::Sqlite(s) => s.fingerprint().await,
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        match self {
            AnyCatalogStore::Memory(s) => s.clear().await,
            AnyCatalogStore::Json(s) => s.clear().await,
            AnyCatalogStore::Sqlite(s) => s.clear().await,
        }
    }

    async fn save_if_unchanged(
        &self,
        catalog: &UnifiedCatalog,
        expected: Option<&str>,
    ) -> StoreResult<()> {
        match self {
            AnyCatalogStore::Memory(s) => s.save_if_unchanged(catalog, expected).await,
            AnyCatalogStore::Json(s) => s.save_if_unchanged(catalog, expected).await,
            AnyCatalogStore::Sqlite(s) => s.save_if_unchanged(catalog, expected).await,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kitwise_core::{unify, CatalogProduct, CompositionDefinition, Money};

    fn catalog(quantity: i64) -> UnifiedCatalog {
        let products = vec![CatalogProduct::new(
            "TAP-01",
            "Chrome tap",
            "Taps",
            Money::from_cents(1500),
            Money::from_cents(2990),
        )];
        let compositions = vec![CompositionDefinition::from_pairs(
            "KIT-01",
            "Sink kit",
            [("Chrome tap", quantity)],
        )];
        unify(&products, &compositions).catalog
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryCatalogStore::new();
        assert!(store.load().await.unwrap().is_none());
        assert!(store.is_stale("anything").await.unwrap());

        let c = catalog(2);
        store.save(&c).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(c.clone()));
        assert!(!store.is_stale(&c.composition_fingerprint).await.unwrap());

        store.clear().await.unwrap();
        assert!(!store.is_populated().await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let a = MemoryCatalogStore::new();
        let b = a.clone();
        a.save(&catalog(1)).await.unwrap();
        assert!(b.is_populated().await);
    }

    #[tokio::test]
    async fn test_save_if_unchanged_detects_conflict() {
        let store = MemoryCatalogStore::new();
        let first = catalog(1);
        let second = catalog(2);

        store.save_if_unchanged(&first, None).await.unwrap();

        // Stale expectation
        let err = store.save_if_unchanged(&second, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        store
            .save_if_unchanged(&second, Some(&first.composition_fingerprint))
            .await
            .unwrap();
        assert_eq!(
            store.fingerprint().await.unwrap(),
            Some(second.composition_fingerprint)
        );
    }

    #[tokio::test]
    async fn test_cached_store_reads_through_once() {
        let backing = MemoryCatalogStore::with_catalog(catalog(1));
        let cached = CachedCatalogStore::new(backing.clone());

        let first = cached.load().await.unwrap().unwrap();

        // Changing the backing store behind the cache is invisible until invalidated
        backing.save(&catalog(3)).await.unwrap();
        assert_eq!(cached.load().await.unwrap().unwrap(), first);

        cached.invalidate().await.unwrap();
        let reloaded = cached.load().await.unwrap().unwrap();
        assert_ne!(reloaded.composition_fingerprint, first.composition_fingerprint);
    }

    #[tokio::test]
    async fn test_cached_store_writes_through() {
        let backing = MemoryCatalogStore::new();
        let cached = CachedCatalogStore::new(backing.clone());
        let c = catalog(2);

        cached.save(&c).await.unwrap();
        assert_eq!(backing.load().await.unwrap(), Some(c.clone()));
        assert_eq!(cached.fingerprint().await.unwrap(), Some(c.composition_fingerprint));

        cached.clear().await.unwrap();
        assert!(backing.load().await.unwrap().is_none());
        assert!(cached.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_any_store_dispatch() {
        let store = AnyCatalogStore::Memory(MemoryCatalogStore::new());
        assert_eq!(store.backend_name(), "memory");
        store.save(&catalog(1)).await.unwrap();
        assert!(store.fingerprint().await.unwrap().is_some());
    }
}
