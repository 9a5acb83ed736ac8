//! # Decomposition Pipeline
//!
//! Validate → classify → decompose, producing the decomposition report.
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ sale lines   │──►│ check_sale_   │──►│ classify(      │──►│ decompose(   │
//! │ (normalized) │   │ line()        │   │  composite_ids)│   │  catalog)    │
//! └──────────────┘   │ → warnings    │   └────────────────┘   │ → anomalies  │
//!                    └───────────────┘                        └──────┬───────┘
//!                                                                    ▼
//!                                                       DecompositionReport
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::classifier::classify;
use crate::decomposer::decompose;
use crate::money::Money;
use crate::types::{SaleLine, UnifiedCatalog};
use crate::validation::check_sale_line;
use crate::DEFAULT_AMOUNT_TOLERANCE_CENTS;

// =============================================================================
// Options & Report
// =============================================================================

/// Knobs for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOptions {
    /// Accepted gap between `lineAmountIncl` and `quantity × unitPriceIncl`.
    pub amount_tolerance: Money,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            amount_tolerance: Money::from_cents(DEFAULT_AMOUNT_TOLERANCE_CENTS),
        }
    }
}

/// Counters of a decomposition run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionStats {
    pub lines_imported: usize,
    pub lines_after_decomposition: usize,
    pub composites_found: usize,
    pub components_added: usize,
    /// Composed lines the catalog could not expand.
    pub errors: Vec<String>,
}

/// The decomposition report document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionReport {
    /// Input lines with their assigned kind.
    pub original_lines: Vec<SaleLine>,
    pub decomposed_lines: Vec<SaleLine>,
    pub stats: DecompositionStats,
    /// Row-level validation warnings.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Sums over a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTotals {
    pub amount_incl: Money,
    pub quantity: i64,
}

// =============================================================================
// Run
// =============================================================================

/// Runs the full pipeline over normalized sale lines.
pub fn run(lines: &[SaleLine], catalog: &UnifiedCatalog, options: &PipelineOptions) -> DecompositionReport {
    let warnings: Vec<String> = lines
        .iter()
        .enumerate()
        .flat_map(|(row, line)| {
            check_sale_line(line, options.amount_tolerance)
                .into_iter()
                .map(move |w| format!("Line {}: {}", row + 1, w))
        })
        .collect();

    let classified = classify(lines, &catalog.composite_ids());
    let decomposition = decompose(&classified, catalog);

    let stats = DecompositionStats {
        lines_imported: lines.len(),
        lines_after_decomposition: decomposition.lines.len(),
        composites_found: decomposition.composites_found,
        components_added: decomposition.added_component_count,
        errors: decomposition.anomalies,
    };

    info!(
        imported = stats.lines_imported,
        decomposed = stats.lines_after_decomposition,
        composites = stats.composites_found,
        components = stats.components_added,
        errors = stats.errors.len(),
        warnings = warnings.len(),
        "Decomposition pipeline finished"
    );

    DecompositionReport {
        original_lines: classified,
        decomposed_lines: decomposition.lines,
        stats,
        warnings,
    }
}

/// Totals of amount and quantity over `lines`.
///
/// Amount totals are identical before and after decomposition; quantity
/// totals grow by the emitted component movements.
pub fn totals(lines: &[SaleLine]) -> LineTotals {
    lines.iter().fold(LineTotals::default(), |mut acc, line| {
        acc.amount_incl = acc.amount_incl.saturating_add(line.line_amount_incl);
        acc.quantity = acc.quantity.saturating_add(line.quantity);
        acc
    })
}

impl DecompositionReport {
    /// True when every composed line was expanded and no row raised a warning.
    pub fn is_clean(&self) -> bool {
        self.stats.errors.is_empty() && self.warnings.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::unify;
    use crate::types::{CatalogProduct, CompositionDefinition, LineKind};

    fn catalog() -> UnifiedCatalog {
        let products = vec![CatalogProduct::new(
            "TAP-01",
            "Chrome tap",
            "Taps",
            Money::from_cents(1500),
            Money::from_cents(2990),
        )];
        let compositions = vec![CompositionDefinition::from_encoded("KIT-01", "Sink kit", ["Chrome tap (2)"])];
        unify(&products, &compositions).catalog
    }

    fn sale(id: &str, quantity: i64, unit: i64, amount: i64) -> SaleLine {
        SaleLine::new("2024-05-02", id, id, quantity, Money::from_cents(unit), Money::from_cents(amount))
            .with_order("T-1")
    }

    #[test]
    fn test_run_fills_report() {
        let lines = vec![sale("KIT-01", 2, 9900, 19800), sale("TAP-01", 1, 2990, 2990)];
        let report = run(&lines, &catalog(), &PipelineOptions::default());

        assert_eq!(report.stats.lines_imported, 2);
        assert_eq!(report.stats.lines_after_decomposition, 3);
        assert_eq!(report.stats.composites_found, 1);
        assert_eq!(report.stats.components_added, 1);
        assert!(report.is_clean());

        assert_eq!(report.original_lines[0].line_kind, LineKind::Composed);
        assert_eq!(report.decomposed_lines[1].quantity, 4);
        assert_eq!(totals(&lines).amount_incl, totals(&report.decomposed_lines).amount_incl);
    }

    #[test]
    fn test_run_collects_warnings_and_errors() {
        // "GHOST" sits next to a silent line, so it is Composed but unknown
        let lines = vec![
            sale("GHOST", 1, 500, 500),
            sale("FREEBIE", 1, 0, 0),
            sale("TAP-01", 2, 2990, 2990).with_order("T-2"),
        ];
        let report = run(&lines, &catalog(), &PipelineOptions::default());

        assert_eq!(report.stats.errors.len(), 1);
        assert!(report.stats.errors[0].contains("GHOST"));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Line 3:"));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = run(&[], &catalog(), &PipelineOptions::default());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("originalLines").is_some());
        assert!(json["stats"].get("linesAfterDecomposition").is_some());
        assert_eq!(json["stats"]["componentsAdded"], 0);
    }

    #[test]
    fn test_totals() {
        let lines = vec![sale("A", 2, 100, 200), sale("B", -1, 100, -100)];
        let t = totals(&lines);
        assert_eq!(t.amount_incl.cents(), 100);
        assert_eq!(t.quantity, 1);
    }

    #[test]
    fn test_totals_saturate_on_extreme_rows() {
        let lines = vec![
            sale("A", i64::MAX, 1, i64::MAX),
            sale("B", 5, 1, 5),
        ];
        let t = totals(&lines);
        assert_eq!(t.amount_incl.cents(), i64::MAX);
        assert_eq!(t.quantity, i64::MAX);
    }
}
