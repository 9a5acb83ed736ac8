//! `kitwise export`: write the stored catalog as its JSON document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use kitwise_core::UnifiedCatalog;
use kitwise_store::CatalogStore;

use super::{require_catalog, write_json};

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Destination file
    #[arg(long)]
    pub out: PathBuf,
}

pub async fn execute<S: CatalogStore>(args: &ExportArgs, store: &S, pretty: bool) -> Result<UnifiedCatalog> {
    let catalog = require_catalog(store).await?;
    let document = catalog
        .to_document()
        .context("Cannot encode the catalog document")?;
    write_json(&args.out, &document, pretty).await?;
    Ok(catalog)
}

pub fn print(args: &ExportArgs, catalog: &UnifiedCatalog) {
    println!(
        "Exported {} products ({} composite) to {}",
        catalog.stats.total,
        catalog.stats.composite,
        args.out.display()
    );
}
