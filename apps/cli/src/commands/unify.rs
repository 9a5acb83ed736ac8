//! `kitwise unify`: build the unified catalog and store it.
//!
//! ## Save Decision
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stored fingerprint == new fingerprint                                  │
//! │  AND stored products == new products     ──► Unchanged (nothing saved)  │
//! │                                                                         │
//! │  otherwise, or --force                   ──► save_if_unchanged(         │
//! │                                                 new, stored fingerprint)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The fingerprint only covers compositions, so catalog edits are caught by
//! comparing the products themselves. The save is conditional on the
//! fingerprint read at the start: a concurrent `unify` makes this one fail
//! with a conflict instead of silently overwriting.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use kitwise_core::{unify_documents, CatalogStats, ProductOrigin, UnifiedCatalog};
use kitwise_store::CatalogStore;

use crate::ingest::compositions::load_compositions_file;
use crate::ingest::products::load_products_file;

use super::print_warnings;

#[derive(Debug, Clone, Args)]
pub struct UnifyArgs {
    /// Product catalog (CSV, or JSON array)
    #[arg(long)]
    pub products: PathBuf,

    /// Composition definitions (JSON array)
    #[arg(long)]
    pub compositions: PathBuf,

    /// Save even when the stored catalog is identical
    #[arg(long)]
    pub force: bool,
}

/// What happened to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnifyAction {
    Saved,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct UnifySummary {
    pub action: UnifyAction,
    pub catalog: UnifiedCatalog,
    pub previous_fingerprint: Option<String>,
    pub resolved_components: usize,
    pub placeholder_components: usize,
    pub warnings: Vec<String>,
}

pub async fn execute<S: CatalogStore>(args: &UnifyArgs, store: &S) -> Result<UnifySummary> {
    let products = load_products_file(&args.products)?;
    let compositions = load_compositions_file(&args.compositions)?;

    let outcome = unify_documents(&products.value, &compositions.value)
        .context("Cannot unify the catalog")?;

    let mut warnings = products.warnings;
    warnings.extend(compositions.warnings);
    warnings.extend(outcome.warnings);

    let stored = store.load().await.context("Cannot read the stored catalog")?;
    let previous_fingerprint = stored.as_ref().map(|c| c.composition_fingerprint.clone());

    let mut catalog = outcome.catalog;
    if let Some(previous) = &stored {
        carry_over_edits(&mut catalog, previous);
    }

    let unchanged = stored.as_ref().is_some_and(|previous| {
        previous.composition_fingerprint == catalog.composition_fingerprint
            && previous.products == catalog.products
    });

    let action = if unchanged && !args.force {
        info!(fingerprint = %catalog.composition_fingerprint, "Catalog unchanged, not saved");
        UnifyAction::Unchanged
    } else {
        store
            .save_if_unchanged(&catalog, previous_fingerprint.as_deref())
            .await
            .context("Cannot save the unified catalog")?;
        UnifyAction::Saved
    };

    Ok(UnifySummary {
        action,
        catalog,
        previous_fingerprint,
        resolved_components: outcome.resolved_components,
        placeholder_components: outcome.placeholder_components,
        warnings,
    })
}

/// Keeps what the user set by hand on the previous catalog.
///
/// A composite whose sell price was edited keeps it, whether it comes from
/// a composition definition or was merged over a catalog row; otherwise the
/// catalog price would win again. Composites appended from a definition
/// start at zero, so they also take any price the previous catalog had.
/// `created_at` stays the date the catalog first existed.
fn carry_over_edits(catalog: &mut UnifiedCatalog, previous: &UnifiedCatalog) {
    catalog.created_at = previous.created_at;

    for product in catalog.products.iter_mut().filter(|p| p.is_composite()) {
        let Some(old) = previous.get(&product.id).filter(|old| old.is_composite()) else {
            continue;
        };
        let unpriced_definition =
            product.origin == ProductOrigin::CompositionDefinition && product.sell_price.is_zero();

        if old.sell_price_edited || unpriced_definition {
            debug!(product = %product.id, price = old.sell_price.cents(), "Sell price carried over");
            product.sell_price = old.sell_price;
            product.sell_price_edited = old.sell_price_edited;
        }
    }
}

pub fn print(summary: &UnifySummary) {
    let catalog = &summary.catalog;
    print_stats(&catalog.stats);
    println!(
        "Components: {} resolved, {} placeholders",
        summary.resolved_components, summary.placeholder_components
    );
    println!("Fingerprint: {}", catalog.composition_fingerprint);

    match summary.action {
        UnifyAction::Saved => match &summary.previous_fingerprint {
            Some(old) if *old != catalog.composition_fingerprint => {
                println!("Compositions changed since the last run; catalog saved.")
            }
            Some(_) => println!("Catalog saved."),
            None => println!("First catalog saved."),
        },
        UnifyAction::Unchanged => println!("Stored catalog is up to date; nothing saved (use --force to rewrite)."),
    }

    print_warnings("Warnings", &summary.warnings);
}

pub(crate) fn print_stats(stats: &CatalogStats) {
    println!(
        "Products: {} ({} simple, {} composite)",
        stats.total, stats.simple, stats.composite
    );
    println!(
        "Origins: {} catalog, {} composition definitions, {} merged",
        stats.by_origin.catalog, stats.by_origin.composition_definition, stats.by_origin.merged
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{write, COMPOSITIONS_JSON, PRODUCTS_CSV};
    use kitwise_core::{Money, ProductKind};
    use kitwise_store::MemoryCatalogStore;

    fn args(dir: &std::path::Path, force: bool) -> UnifyArgs {
        UnifyArgs {
            products: write(dir, "products.csv", PRODUCTS_CSV),
            compositions: write(dir, "kits.json", COMPOSITIONS_JSON),
            force,
        }
    }

    #[tokio::test]
    async fn test_first_run_saves() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryCatalogStore::new();

        let summary = execute(&args(dir.path(), false), &store).await.unwrap();

        assert_eq!(summary.action, UnifyAction::Saved);
        assert_eq!(summary.previous_fingerprint, None);
        assert_eq!(summary.placeholder_components, 1);
        assert_eq!(summary.warnings.len(), 1, "{:?}", summary.warnings);
        assert!(summary.warnings[0].contains("PTFE tape"));

        let stored = store.load().await.unwrap().unwrap();
        let kit = stored.get("KIT-01").unwrap();
        assert_eq!(kit.kind, ProductKind::Composite);
        assert_eq!(kit.purchase_price, Money::from_cents(1500 + 4000));
    }

    #[tokio::test]
    async fn test_second_run_is_skipped_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryCatalogStore::new();
        execute(&args(dir.path(), false), &store).await.unwrap();

        let again = execute(&args(dir.path(), false), &store).await.unwrap();
        assert_eq!(again.action, UnifyAction::Unchanged);

        let forced = execute(&args(dir.path(), true), &store).await.unwrap();
        assert_eq!(forced.action, UnifyAction::Saved);
    }

    #[tokio::test]
    async fn test_catalog_edit_without_composition_change_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryCatalogStore::new();
        let first = execute(&args(dir.path(), false), &store).await.unwrap();

        let mut edited = args(dir.path(), false);
        edited.products = write(
            dir.path(),
            "products2.csv",
            &PRODUCTS_CSV.replace("40,00", "42,00"),
        );
        let second = execute(&edited, &store).await.unwrap();

        assert_eq!(second.catalog.composition_fingerprint, first.catalog.composition_fingerprint);
        assert_eq!(second.action, UnifyAction::Saved);
        let kit = store.load().await.unwrap().unwrap();
        assert_eq!(kit.get("KIT-01").unwrap().purchase_price, Money::from_cents(1500 + 4200));
    }

    #[tokio::test]
    async fn test_composite_sell_price_survives_reunification() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryCatalogStore::new();
        execute(&args(dir.path(), false), &store).await.unwrap();

        let mut stored = store.load().await.unwrap().unwrap();
        let created = stored.created_at;
        stored
            .set_sell_price("KIT-02", Money::from_cents(1990), chrono::Utc::now())
            .unwrap();
        store.save(&stored).await.unwrap();

        let summary = execute(&args(dir.path(), false), &store).await.unwrap();
        assert_eq!(summary.action, UnifyAction::Unchanged);
        assert_eq!(summary.catalog.get("KIT-02").unwrap().sell_price, Money::from_cents(1990));
        assert_eq!(summary.catalog.created_at, created);
    }

    #[tokio::test]
    async fn test_edited_price_of_merged_composite_survives_reunification() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryCatalogStore::new();
        let mut merged = args(dir.path(), false);
        merged.products = write(
            dir.path(),
            "products-with-kit.csv",
            &format!("{}KIT-01;Sink Kit;Kits;0,00;100,00\n", PRODUCTS_CSV),
        );

        let first = execute(&merged, &store).await.unwrap();
        let kit = first.catalog.get("KIT-01").unwrap();
        assert_eq!(kit.origin, ProductOrigin::Merged);
        assert_eq!(kit.sell_price, Money::from_cents(10000));

        let mut stored = store.load().await.unwrap().unwrap();
        stored
            .set_sell_price("KIT-01", Money::from_cents(14900), chrono::Utc::now())
            .unwrap();
        store.save(&stored).await.unwrap();

        let again = execute(&merged, &store).await.unwrap();
        assert_eq!(again.action, UnifyAction::Unchanged);
        let kit = store.load().await.unwrap().unwrap();
        assert_eq!(kit.get("KIT-01").unwrap().sell_price, Money::from_cents(14900));
        assert!(kit.get("KIT-01").unwrap().sell_price_edited);

        // A catalog change elsewhere still saves without touching the edit
        let mut edited = merged.clone();
        edited.products = write(
            dir.path(),
            "products-with-kit2.csv",
            &format!("{}KIT-01;Sink Kit;Kits;0,00;100,00\n", PRODUCTS_CSV.replace("40,00", "42,00")),
        );
        let third = execute(&edited, &store).await.unwrap();
        assert_eq!(third.action, UnifyAction::Saved);
        let kit = store.load().await.unwrap().unwrap();
        assert_eq!(kit.get("KIT-01").unwrap().sell_price, Money::from_cents(14900));
    }

    #[tokio::test]
    async fn test_unedited_merged_composite_follows_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryCatalogStore::new();
        let mut merged = args(dir.path(), false);
        merged.products = write(
            dir.path(),
            "products-with-kit.csv",
            &format!("{}KIT-01;Sink Kit;Kits;0,00;100,00\n", PRODUCTS_CSV),
        );
        execute(&merged, &store).await.unwrap();

        merged.products = write(
            dir.path(),
            "products-with-kit.csv",
            &format!("{}KIT-01;Sink Kit;Kits;0,00;120,00\n", PRODUCTS_CSV),
        );
        let second = execute(&merged, &store).await.unwrap();
        assert_eq!(second.action, UnifyAction::Saved);
        assert_eq!(second.catalog.get("KIT-01").unwrap().sell_price, Money::from_cents(12000));
    }

    #[tokio::test]
    async fn test_structural_error_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = args(dir.path(), false);
        bad.compositions = write(dir.path(), "kits.json", r#"{"KIT-01": []}"#);

        let err = execute(&bad, &MemoryCatalogStore::new()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Structural violation"));
    }
}
