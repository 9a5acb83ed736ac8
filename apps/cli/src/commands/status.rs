//! `kitwise status`: what is in the store right now.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Args;

use kitwise_core::{Money, TaxRate, UnifiedCatalog};
use kitwise_store::CatalogStore;

use super::unify::print_stats;

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    /// Also list, for each component, the composites that use it
    #[arg(long)]
    pub components: bool,
}

/// One composite as shown in the status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeRow {
    pub id: String,
    pub name: String,
    pub component_count: usize,
    pub cost: Money,
    pub sell_price: Money,
    pub margin: Money,
    pub has_placeholder: bool,
}

#[derive(Debug, Clone)]
pub struct StatusSummary {
    pub backend: &'static str,
    pub catalog: Option<UnifiedCatalog>,
    pub composites: Vec<CompositeRow>,
    pub usage: Option<BTreeMap<String, Vec<String>>>,
    pub tax_rate: TaxRate,
}

pub async fn execute<S: CatalogStore>(
    args: &StatusArgs,
    store: &S,
    backend: &'static str,
    tax_rate: TaxRate,
) -> Result<StatusSummary> {
    let catalog = store.load().await.context("Cannot load the stored catalog")?;

    let composites = catalog
        .as_ref()
        .map(|c| composite_rows(c, tax_rate))
        .unwrap_or_default();
    let usage = match (&catalog, args.components) {
        (Some(c), true) => Some(c.usage_index()),
        _ => None,
    };

    Ok(StatusSummary {
        backend,
        catalog,
        composites,
        usage,
        tax_rate,
    })
}

fn composite_rows(catalog: &UnifiedCatalog, rate: TaxRate) -> Vec<CompositeRow> {
    catalog
        .products
        .iter()
        .filter(|p| p.is_composite())
        .map(|p| CompositeRow {
            id: p.id.clone(),
            name: p.name.clone(),
            component_count: p.components.len(),
            cost: p.purchase_price,
            sell_price: p.sell_price,
            margin: p.margin(rate),
            has_placeholder: p
                .components
                .iter()
                .any(|link| catalog.get(&link.component_id).is_none()),
        })
        .collect()
}

pub fn print(summary: &StatusSummary) {
    println!("Store: {}", summary.backend);

    let Some(catalog) = &summary.catalog else {
        println!("No unified catalog stored yet. Run `kitwise unify`.");
        return;
    };

    println!("Schema version: {}", catalog.schema_version);
    println!("Fingerprint: {}", catalog.composition_fingerprint);
    println!("Created: {}", catalog.created_at.to_rfc3339());
    println!("Modified: {}", catalog.modified_at.to_rfc3339());
    print_stats(&catalog.stats);

    if !summary.composites.is_empty() {
        println!();
        println!(
            "{:<16} {:<28} {:>5} {:>10} {:>10} {:>10}",
            "ID", "NAME", "PARTS", "COST", "SELL", "MARGIN"
        );
        for row in &summary.composites {
            println!(
                "{:<16} {:<28} {:>5} {:>10} {:>10} {:>10}{}",
                row.id,
                truncate(&row.name, 28),
                row.component_count,
                row.cost.to_string(),
                row.sell_price.to_string(),
                row.margin.to_string(),
                if row.has_placeholder { "  (placeholder parts)" } else { "" }
            );
        }
        println!(
            "Margins use a {}.{:02}% tax rate.",
            summary.tax_rate.bps() / 100,
            summary.tax_rate.bps() % 100
        );
    }

    if let Some(usage) = &summary.usage {
        println!();
        println!("Component usage:");
        for (component, composites) in usage {
            let name = catalog
                .get(component)
                .map(|p| p.name.as_str())
                .unwrap_or("(not in catalog)");
            println!("  {} {}: {}", component, name, composites.join(", "));
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitwise_core::{unify, CatalogProduct, CompositionDefinition};
    use kitwise_store::MemoryCatalogStore;

    fn catalog() -> UnifiedCatalog {
        let products = vec![
            CatalogProduct::new("TAP-01", "Chrome Tap", "Taps", Money::from_cents(1500), Money::from_cents(2990)),
            CatalogProduct::new("KIT-01", "Sink Kit", "Kits", Money::zero(), Money::from_cents(6000)),
        ];
        let compositions = vec![
            CompositionDefinition::from_encoded("KIT-01", "Sink Kit", ["Chrome Tap (2)"]),
            CompositionDefinition::from_encoded("KIT-02", "Spare Kit", ["Chrome Tap (1)", "Gasket (4)"]),
        ];
        unify(&products, &compositions).catalog
    }

    #[tokio::test]
    async fn test_status_of_populated_store() {
        let store = MemoryCatalogStore::with_catalog(catalog());
        let args = StatusArgs { components: true };

        let summary = execute(&args, &store, "memory", TaxRate::from_bps(2000))
            .await
            .unwrap();

        assert_eq!(summary.composites.len(), 2);
        let sink = &summary.composites[0];
        assert_eq!(sink.id, "KIT-01");
        assert_eq!(sink.cost, Money::from_cents(3000));
        // 60.00 incl. 20% → 50.00 excl., minus 30.00 cost
        assert_eq!(sink.margin, Money::from_cents(2000));
        assert!(!sink.has_placeholder);
        assert!(summary.composites[1].has_placeholder);

        let usage = summary.usage.unwrap();
        assert_eq!(usage["TAP-01"], vec!["KIT-01".to_string(), "KIT-02".to_string()]);
    }

    #[tokio::test]
    async fn test_status_of_empty_store() {
        let summary = execute(
            &StatusArgs { components: true },
            &MemoryCatalogStore::new(),
            "memory",
            TaxRate::default(),
        )
        .await
        .unwrap();

        assert!(summary.catalog.is_none());
        assert!(summary.composites.is_empty());
        assert!(summary.usage.is_none());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Sink Kit", 28), "Sink Kit");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
