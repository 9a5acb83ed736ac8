//! `kitwise price`: set the sell price of a composite.
//!
//! Composite sell prices are a commercial decision, never derived from the
//! components, so this is the only way they change.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use tracing::info;

use kitwise_core::{Money, ProductRecord};
use kitwise_store::CatalogStore;

use super::require_catalog;

#[derive(Debug, Clone, Args)]
pub struct PriceArgs {
    /// Composite product id
    pub id: String,

    /// Sell price, tax included ("149.00", "149,00")
    pub price: String,
}

#[derive(Debug, Clone)]
pub struct PriceChange {
    pub product: ProductRecord,
    pub previous: Money,
}

pub async fn execute<S: CatalogStore>(args: &PriceArgs, store: &S) -> Result<PriceChange> {
    let price = Money::parse_decimal(&args.price)
        .with_context(|| format!("Invalid price '{}'", args.price))?;

    let mut catalog = require_catalog(store).await?;
    let expected = catalog.composition_fingerprint.clone();

    let previous = catalog
        .get(&args.id)
        .map(|p| p.sell_price)
        .unwrap_or_default();
    catalog
        .set_sell_price(&args.id, price, Utc::now())
        .with_context(|| format!("Cannot set the price of '{}'", args.id))?;

    store
        .save_if_unchanged(&catalog, Some(&expected))
        .await
        .context("Cannot save the catalog")?;

    let product = catalog
        .get(&args.id)
        .cloned()
        .context("Product vanished after the price update")?;

    info!(product = %product.id, from = previous.cents(), to = price.cents(), "Sell price updated");
    Ok(PriceChange { product, previous })
}

pub fn print(change: &PriceChange) {
    let p = &change.product;
    println!(
        "{} {}: sell price {} → {} (cost {})",
        p.id, p.name, change.previous, p.sell_price, p.purchase_price
    );
}
