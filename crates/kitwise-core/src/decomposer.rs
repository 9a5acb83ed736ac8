//! # Sale Decomposer
//!
//! Expands each sale of a composite into zero-revenue component lines.
//!
//! ## Expansion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  IN   KIT-01  Sink kit      qty 3   unit 99.00   amount 297.00  Composed │
//! │                                                                         │
//! │  OUT  KIT-01  Sink kit      qty 3   unit 99.00   amount 297.00  Composed │
//! │       TAP-01  Chrome tap    qty 6   unit  0.00   amount   0.00  Cumulated│
//! │       BWL-02  Basin         qty 3   unit  0.00   amount   0.00  Cumulated│
//! │                                                                         │
//! │  The composite keeps the billed amount. Components only carry unit     │
//! │  movement, so Σ amount is identical before and after.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Component lines copy every other field of their parent (date, order
//! reference, commercial metadata). Returns (negative quantity) produce
//! negative component quantities.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::money::Money;
use crate::types::{ComponentLink, LineKind, ProductRecord, SaleLine, UnifiedCatalog};

/// Output of [`decompose`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decomposition {
    pub lines: Vec<SaleLine>,
    /// Synthetic component lines emitted.
    pub added_component_count: usize,
    /// Composed lines that were expanded.
    pub composites_found: usize,
    /// Composed lines left untouched because the catalog could not expand them.
    pub anomalies: Vec<String>,
}

/// Decomposes every Composed line that resolves to a composite record.
///
/// Lines must already be classified; anything not `Composed` passes through.
pub fn decompose(lines: &[SaleLine], catalog: &UnifiedCatalog) -> Decomposition {
    let mut by_id: HashMap<&str, &ProductRecord> = HashMap::with_capacity(catalog.products.len());
    for product in &catalog.products {
        by_id.entry(product.id.as_str()).or_insert(product);
    }

    let mut result = Decomposition {
        lines: Vec::with_capacity(lines.len()),
        ..Decomposition::default()
    };

    for (row, line) in lines.iter().enumerate() {
        result.lines.push(line.clone());

        if line.line_kind != LineKind::Composed {
            continue;
        }

        match by_id.get(line.product_id.as_str()) {
            Some(record) if record.is_composite() => {
                result.composites_found += 1;
                for link in &record.components {
                    result.lines.push(component_line(line, link));
                    result.added_component_count += 1;
                }
            }
            Some(_) => {
                warn!(row = row + 1, product = %line.product_id, "Composed line refers to a simple product");
                result.anomalies.push(format!(
                    "Line {}: product '{}' is classified as composed but is not a composite in the catalog",
                    row + 1,
                    line.product_id
                ));
            }
            None => {
                warn!(row = row + 1, product = %line.product_id, "Composed line not found in catalog");
                result.anomalies.push(format!(
                    "Line {}: composed product '{}' not found in catalog",
                    row + 1,
                    line.product_id
                ));
            }
        }
    }

    debug!(
        input = lines.len(),
        output = result.lines.len(),
        composites = result.composites_found,
        components = result.added_component_count,
        anomalies = result.anomalies.len(),
        "Sales decomposed"
    );

    result
}

fn component_line(parent: &SaleLine, link: &ComponentLink) -> SaleLine {
    SaleLine {
        product_id: link.component_id.clone(),
        product_name: link.component_name.clone(),
        quantity: parent.quantity.saturating_mul(i64::from(link.quantity)),
        unit_price_incl: Money::zero(),
        line_amount_incl: Money::zero(),
        line_kind: LineKind::Cumulated,
        ..parent.clone()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
