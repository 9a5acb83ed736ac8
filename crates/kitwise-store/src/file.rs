//! # JSON File Store
//!
//! Keeps the catalog document as one pretty-printed JSON file.
//!
//! ## Write Path
//! ```text
//! catalog ──► to_document() ──► kitwise-catalog.json.tmp ──rename──► kitwise-catalog.json
//! ```
//! A crash mid-write leaves the previous document intact.

use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use kitwise_core::UnifiedCatalog;

use crate::error::StoreResult;
use crate::store::CatalogStore;

/// Catalog store backed by a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileCatalogStore {
    path: PathBuf,
}

impl JsonFileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileCatalogStore { path: path.into() }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CatalogStore for JsonFileCatalogStore {
    async fn load(&self) -> StoreResult<Option<UnifiedCatalog>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let document: Value = serde_json::from_str(&text)?;
        let catalog = UnifiedCatalog::from_document(&document)?;

        debug!(
            path = %self.path.display(),
            products = catalog.stats.total,
            "Catalog document loaded"
        );
        Ok(Some(catalog))
    }

    async fn save(&self, catalog: &UnifiedCatalog) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let text = serde_json::to_string_pretty(&catalog.to_document()?)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, text).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        info!(
            path = %self.path.display(),
            fingerprint = %catalog.composition_fingerprint,
            "Catalog document written"
        );
        Ok(())
    }

    async fn fingerprint(&self) -> StoreResult<Option<String>> {
        Ok(self.load().await?.map(|c| c.composition_fingerprint))
    }

    async fn clear(&self) -> StoreResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
