//! # Snapshot Repository
//!
//! SQLite-backed [`CatalogStore`].
//!
//! ## Wholesale Replacement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. DELETE FROM catalog_snapshots                                       │
//! │  2. INSERT INTO catalog_snapshots (id, fingerprint, counts, document)   │
//! │                                                                         │
//! │  COMMIT ← readers see the old snapshot or the new one, never neither   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use kitwise_core::UnifiedCatalog;

use crate::error::{StoreError, StoreResult};
use crate::store::CatalogStore;

/// Metadata of the stored snapshot, readable without parsing the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub id: String,
    pub schema_version: u32,
    pub composition_fingerprint: String,
    pub product_count: i64,
    pub composite_count: i64,
    pub saved_at: DateTime<Utc>,
}

/// Catalog store over the `catalog_snapshots` table.
#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteCatalogStore { pool }
    }

    /// Metadata of the current snapshot, if any.
    pub async fn info(&self) -> StoreResult<Option<SnapshotInfo>> {
        let row = sqlx::query(
            r#"
            SELECT id, schema_version, composition_fingerprint,
                   product_count, composite_count, saved_at
            FROM catalog_snapshots
            ORDER BY saved_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> StoreResult<SnapshotInfo> {
            let schema_version: i64 = row.try_get("schema_version")?;
            Ok(SnapshotInfo {
                id: row.try_get("id")?,
                schema_version: u32::try_from(schema_version)
                    .map_err(|_| StoreError::Internal(format!("bad schema_version {}", schema_version)))?,
                composition_fingerprint: row.try_get("composition_fingerprint")?,
                product_count: row.try_get("product_count")?,
                composite_count: row.try_get("composite_count")?,
                saved_at: row.try_get("saved_at")?,
            })
        })
        .transpose()
    }

    /// Number of stored snapshots (0 or 1).
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

impl CatalogStore for SqliteCatalogStore {
    async fn load(&self) -> StoreResult<Option<UnifiedCatalog>> {
        let document: Option<String> = sqlx::query_scalar(
            "SELECT document FROM catalog_snapshots ORDER BY saved_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match document {
            Some(text) => {
                let value: Value = serde_json::from_str(&text)?;
                let catalog = UnifiedCatalog::from_document(&value)?;
                debug!(products = catalog.stats.total, "Snapshot loaded");
                Ok(Some(catalog))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, catalog: &UnifiedCatalog) -> StoreResult<()> {
        let id = Uuid::new_v4().to_string();
        let document = serde_json::to_string(&catalog.to_document()?)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM catalog_snapshots")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO catalog_snapshots (
                id, schema_version, composition_fingerprint,
                product_count, composite_count,
                created_at, modified_at, saved_at, document
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(i64::from(catalog.schema_version))
        .bind(&catalog.composition_fingerprint)
        .bind(catalog.stats.total as i64)
        .bind(catalog.stats.composite as i64)
        .bind(catalog.created_at)
        .bind(catalog.modified_at)
        .bind(Utc::now())
        .bind(&document)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            snapshot = %id,
            fingerprint = %catalog.composition_fingerprint,
            products = catalog.stats.total,
            "Catalog snapshot saved"
        );
        Ok(())
    }

    async fn fingerprint(&self) -> StoreResult<Option<String>> {
        let fingerprint: Option<String> = sqlx::query_scalar(
            "SELECT composition_fingerprint FROM catalog_snapshots ORDER BY saved_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(fingerprint)
    }

    async fn clear(&self) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM catalog_snapshots")
            .execute(&self.pool)
            .await?;
        debug!(removed = result.rows_affected(), "Snapshots cleared");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use kitwise_core::{unify, CatalogProduct, CompositionDefinition, Money};

    async fn store() -> SqliteCatalogStore {
        Database::new(DbConfig::in_memory()).await.unwrap().snapshots()
    }

    fn catalog(quantity: i64) -> UnifiedCatalog {
        let products = vec![
            CatalogProduct::new("TAP-01", "Chrome tap", "Taps", Money::from_cents(1500), Money::from_cents(2990)),
            CatalogProduct::new("BWL-02", "Basin", "Basins", Money::from_cents(4000), Money::from_cents(8900)),
        ];
        let compositions = vec![CompositionDefinition::from_pairs(
            "KIT-01",
            "Sink kit",
            [("Chrome tap", quantity), ("Basin", 1)],
        )];
        unify(&products, &compositions).catalog
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = store().await;
        assert!(store.load().await.unwrap().is_none());
        assert!(store.fingerprint().await.unwrap().is_none());
        assert!(store.info().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = store().await;
        let c = catalog(2);

        store.save(&c).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(c.clone()));
        assert_eq!(store.fingerprint().await.unwrap(), Some(c.composition_fingerprint.clone()));

        let info = store.info().await.unwrap().unwrap();
        assert_eq!(info.product_count, 3);
        assert_eq!(info.composite_count, 1);
        assert_eq!(info.schema_version, c.schema_version);
    }

    #[tokio::test]
    async fn test_save_replaces_wholesale() {
        let store = store().await;
        store.save(&catalog(1)).await.unwrap();
        let second = catalog(5);
        store.save(&second).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.load().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_optimistic_save() {
        let store = store().await;
        let first = catalog(1);
        store.save(&first).await.unwrap();

        assert!(store.is_stale("v1:other").await.unwrap());
        assert!(!store.is_stale(&first.composition_fingerprint).await.unwrap());

        let err = store
            .save_if_unchanged(&catalog(2), Some("v1:other"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = store().await;
        store.save(&catalog(1)).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
