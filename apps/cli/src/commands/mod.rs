//! # Commands
//!
//! Every subcommand is split in two: an `execute` that talks to the store
//! and returns a summary, and a `print` that renders it. Tests drive
//! `execute` against an in-memory store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  unify      products + compositions ──► UnifiedCatalog ──► store        │
//! │  decompose  store + sales ──► DecompositionReport ──► file              │
//! │  status     store ──► fingerprint, stats, composites                    │
//! │  export     store ──► catalog document ──► file                         │
//! │  price      store ──► set composite sell price ──► store                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod decompose;
pub mod export;
pub mod price;
pub mod status;
pub mod unify;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use kitwise_core::UnifiedCatalog;
use kitwise_store::{AnyCatalogStore, CatalogStore, Database, DbConfig, JsonFileCatalogStore, MemoryCatalogStore};

use crate::config::{AppConfig, StoreBackend};

/// Opens the store the configuration points at.
pub async fn open_store(config: &AppConfig) -> Result<AnyCatalogStore> {
    let backend = config.store.backend;
    let path = config.store.resolved_path();

    let store = match (backend, path) {
        (StoreBackend::Memory, _) => {
            warn!("Memory store selected: nothing will persist after this command");
            AnyCatalogStore::Memory(MemoryCatalogStore::new())
        }
        (StoreBackend::Json, Some(path)) => AnyCatalogStore::Json(JsonFileCatalogStore::new(path)),
        (StoreBackend::Sqlite, Some(path)) => {
            let db = Database::new(DbConfig::new(&path))
                .await
                .with_context(|| format!("Cannot open catalog database {}", path.display()))?;
            AnyCatalogStore::Sqlite(db.snapshots())
        }
        (_, None) => anyhow::bail!(
            "No data directory available for the {} store; set store.path or KITWISE_STORE_PATH",
            backend
        ),
    };

    info!(backend = store.backend_name(), "Catalog store opened");
    Ok(store)
}

/// Loads the stored catalog, failing with a hint when there is none.
pub async fn require_catalog<S: CatalogStore>(store: &S) -> Result<UnifiedCatalog> {
    store
        .load()
        .await
        .context("Cannot load the stored catalog")?
        .context("No unified catalog stored yet; run `kitwise unify` first")
}

/// Writes a serializable value as JSON, creating parent directories.
pub async fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Cannot encode JSON output")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Cannot write {}", path.display()))?;

    info!(path = %path.display(), "Output written");
    Ok(())
}

/// Prints warnings under a heading, capped so huge exports stay readable.
pub fn print_warnings(heading: &str, warnings: &[String]) {
    const SHOWN: usize = 20;

    if warnings.is_empty() {
        return;
    }
    println!("{} ({}):", heading, warnings.len());
    for warning in warnings.iter().take(SHOWN) {
        println!("  - {}", warning);
    }
    if warnings.len() > SHOWN {
        println!("  ... {} more", warnings.len() - SHOWN);
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::{Path, PathBuf};

    pub const PRODUCTS_CSV: &str = "id;name;category;purchase price;sell price\n\
        TAP-01;Chrome Tap;Taps;15,00;29,90\n\
        SIP-03;Siphon;Waste;3,50;7,90\n\
        BWL-02;Basin;Basins;40,00;89,00\n";

    pub const COMPOSITIONS_JSON: &str = r#"[
        {"id": "KIT-01", "name": "Sink Kit", "components": [{"name": "Chrome Tap", "quantity": 1}, {"name": "Basin", "quantity": 1}]},
        {"id": "KIT-02", "name": "Repair Kit", "encodedStrings": ["Siphon (2)", "PTFE tape (1)"]}
    ]"#;

    pub const SALES_CSV: &str = "date,ticket,sku,product,qty,unit price,amount\n\
        2024-03-02,T-1,KIT-01,Sink Kit,1,149.00,149.00\n\
        2024-03-02,T-1,TAP-01,Chrome Tap,1,0,0\n\
        2024-03-02,T-1,BWL-02,Basin,1,0,0\n\
        2024-03-02,T-2,SIP-03,Siphon,1,7.90,7.90\n";

    pub fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitwise_store::StoreError;

    #[tokio::test]
    async fn test_open_store_per_backend() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Json;
        config.store.path = Some(dir.path().join("catalog.json"));
        assert_eq!(open_store(&config).await.unwrap().backend_name(), "json");

        config.store.backend = StoreBackend::Sqlite;
        config.store.path = Some(dir.path().join("data").join("kitwise.db"));
        assert_eq!(open_store(&config).await.unwrap().backend_name(), "sqlite");
        assert!(dir.path().join("data").join("kitwise.db").exists());

        config.store.backend = StoreBackend::Memory;
        assert_eq!(open_store(&config).await.unwrap().backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_require_catalog_on_empty_store() {
        let err = require_catalog(&MemoryCatalogStore::new()).await.unwrap_err();
        assert!(err.to_string().contains("kitwise unify"));
        assert!(err.downcast_ref::<StoreError>().is_none());
    }

    #[tokio::test]
    async fn test_write_json_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("value.json");

        write_json(&path, &serde_json::json!({"a": 1}), false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"a":1}"#);
    }
}
