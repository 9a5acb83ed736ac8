//! # Domain Types
//!
//! Records exchanged at the engine boundary.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  INPUTS                           OUTPUTS                               │
//! │  ┌─────────────────┐              ┌───────────────────────────────┐     │
//! │  │ CatalogProduct  │──┐           │ UnifiedCatalog                │     │
//! │  └─────────────────┘  │  unify()  │  products: [ProductRecord]    │     │
//! │  ┌─────────────────┐  ├─────────► │   └─ components:              │     │
//! │  │ Composition-    │──┘           │        [ComponentLink]        │     │
//! │  │ Definition      │              │  compositionFingerprint       │     │
//! │  │  └─ RawComponent│              │  stats: CatalogStats          │     │
//! │  └─────────────────┘              └───────────────────────────────┘     │
//! │                                                                         │
//! │  ┌─────────────────┐  classify()  ┌─────────────────┐                   │
//! │  │ SaleLine        │────────────► │ SaleLine        │ + lineKind        │
//! │  └─────────────────┘  decompose() └─────────────────┘                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! A `ComponentLink` belongs to exactly one composite `ProductRecord`. Links
//! are cloned, never shared, so editing one composite cannot leak into another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, TaxRate};
use crate::validation::validate_price;

// =============================================================================
// Product Kind & Origin
// =============================================================================

/// Whether a product is sold as-is or assembled from components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    #[default]
    Simple,
    Composite,
}

/// Which source a unified record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductOrigin {
    /// Present only in the product catalog.
    #[default]
    Catalog,
    /// Present only as a composition definition.
    CompositionDefinition,
    /// Catalog product upgraded by a composition with the same id.
    Merged,
}

// =============================================================================
// Catalog Product (input)
// =============================================================================

/// One row of the master product catalog, already normalized by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Purchase price, tax excluded.
    #[serde(default)]
    pub purchase_price: Money,
    /// Sell price, tax included.
    #[serde(default)]
    pub sell_price: Money,
}

impl CatalogProduct {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        purchase_price: Money,
        sell_price: Money,
    ) -> Self {
        CatalogProduct {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            purchase_price,
            sell_price,
        }
    }
}

// =============================================================================
// Composition Definition (input)
// =============================================================================

/// A component entry as authored in the composition editor.
///
/// Both encodings appear in the wild, sometimes in the same list:
/// ```text
/// { "name": "Chrome Tap", "quantity": 2 }     ← Structured
/// "Chrome Tap (2)"                            ← Encoded
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum RawComponent {
    Structured { name: String, quantity: i64 },
    Encoded(String),
    /// Anything else; kept so one bad entry does not sink its composition.
    Malformed(#[ts(type = "unknown")] serde_json::Value),
}

/// A user-authored bundle, before it is merged into the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CompositionDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub components: Vec<RawComponent>,
}

impl CompositionDefinition {
    /// Builds a definition from `{name, quantity}` pairs.
    pub fn from_pairs<N: Into<String>>(
        id: impl Into<String>,
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (N, i64)>,
    ) -> Self {
        CompositionDefinition {
            id: id.into(),
            name: name.into(),
            components: pairs
                .into_iter()
                .map(|(name, quantity)| RawComponent::Structured {
                    name: name.into(),
                    quantity,
                })
                .collect(),
        }
    }

    /// Builds a definition from `"<name> (<quantity>)"` strings.
    pub fn from_encoded<S: Into<String>>(
        id: impl Into<String>,
        name: impl Into<String>,
        entries: impl IntoIterator<Item = S>,
    ) -> Self {
        CompositionDefinition {
            id: id.into(),
            name: name.into(),
            components: entries
                .into_iter()
                .map(|e| RawComponent::Encoded(e.into()))
                .collect(),
        }
    }
}

// =============================================================================
// Component Link
// =============================================================================

/// A quantity-scaled reference from a composite to a simple product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ComponentLink {
    pub component_id: String,
    pub component_name: String,
    /// Always >= 1.
    pub quantity: u32,
    pub purchase_price: Money,
    pub sell_price: Money,
}

impl ComponentLink {
    /// Builds a link from a resolved catalog record.
    pub fn resolved(record: &ProductRecord, quantity: u32) -> Self {
        ComponentLink {
            component_id: record.id.clone(),
            component_name: record.name.clone(),
            quantity,
            purchase_price: record.purchase_price,
            sell_price: record.sell_price,
        }
    }

    /// Builds a zero-priced link for a name no catalog product matched.
    pub fn placeholder(name: &str, quantity: u32) -> Self {
        ComponentLink {
            component_id: placeholder_id(name),
            component_name: name.trim().to_string(),
            quantity,
            purchase_price: Money::zero(),
            sell_price: Money::zero(),
        }
    }

    /// Purchase cost of this link (`purchase_price × quantity`).
    #[inline]
    pub fn line_cost(&self) -> Money {
        self.purchase_price * self.quantity
    }
}

/// Identifier synthesized for an unmatched component name.
///
/// Uppercased name with each whitespace run replaced by one underscore.
///
/// ## Example
/// ```rust
/// use kitwise_core::placeholder_id;
///
/// assert_eq!(placeholder_id("  Brass  fitting 12mm "), "BRASS_FITTING_12MM");
/// ```
pub fn placeholder_id(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

// =============================================================================
// Product Record
// =============================================================================

/// A product of the unified catalog.
///
/// ## Invariants
/// - `id` is unique across the catalog
/// - `kind == Composite` ⇒ `components` is non-empty
/// - `kind == Simple` ⇒ `components` is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Purchase price, tax excluded. Derived for composites.
    pub purchase_price: Money,
    /// Sell price, tax included. Never derived.
    pub sell_price: Money,
    /// Set once the sell price was assigned by hand; such prices outlive
    /// later unifications.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sell_price_edited: bool,
    pub kind: ProductKind,
    pub origin: ProductOrigin,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentLink>,
}

impl ProductRecord {
    /// Seeds a simple record from a catalog row.
    pub fn from_catalog(product: &CatalogProduct) -> Self {
        ProductRecord {
            id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            purchase_price: product.purchase_price,
            sell_price: product.sell_price,
            sell_price_edited: false,
            kind: ProductKind::Simple,
            origin: ProductOrigin::Catalog,
            components: Vec::new(),
        }
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        self.kind == ProductKind::Composite
    }

    /// Σ(component purchase price × quantity).
    pub fn derived_cost(&self) -> Money {
        self.components.iter().map(ComponentLink::line_cost).sum()
    }

    /// Sell price excluding tax minus purchase price.
    pub fn margin(&self, rate: TaxRate) -> Money {
        self.sell_price.excluding_tax(rate) - self.purchase_price
    }
}

// =============================================================================
// Unified Catalog
// =============================================================================

/// Per-origin record counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OriginCounts {
    pub catalog: usize,
    pub composition_definition: usize,
    pub merged: usize,
}

/// Aggregate counts of a unified catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub simple: usize,
    pub composite: usize,
    pub by_origin: OriginCounts,
}

impl CatalogStats {
    /// Counts the given records.
    pub fn compute(products: &[ProductRecord]) -> Self {
        let mut stats = CatalogStats {
            total: products.len(),
            ..CatalogStats::default()
        };

        for product in products {
            match product.kind {
                ProductKind::Simple => stats.simple += 1,
                ProductKind::Composite => stats.composite += 1,
            }
            match product.origin {
                ProductOrigin::Catalog => stats.by_origin.catalog += 1,
                ProductOrigin::CompositionDefinition => {
                    stats.by_origin.composition_definition += 1
                }
                ProductOrigin::Merged => stats.by_origin.merged += 1,
            }
        }

        stats
    }
}

/// The reconciled catalog. This is also the persisted/exported document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedCatalog {
    pub products: Vec<ProductRecord>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub modified_at: DateTime<Utc>,
    pub schema_version: u32,
    pub composition_fingerprint: String,
    pub stats: CatalogStats,
}

impl UnifiedCatalog {
    /// Looks a record up by id.
    pub fn get(&self, id: &str) -> Option<&ProductRecord> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Ids of every composite record.
    pub fn composite_ids(&self) -> HashSet<String> {
        self.products
            .iter()
            .filter(|p| p.is_composite())
            .map(|p| p.id.clone())
            .collect()
    }

    /// Composite id → its component links.
    pub fn composition_map(&self) -> HashMap<&str, &[ComponentLink]> {
        self.products
            .iter()
            .filter(|p| p.is_composite())
            .map(|p| (p.id.as_str(), p.components.as_slice()))
            .collect()
    }

    /// Component ids grouped by the composites that use them.
    ///
    /// Used by reports to show where a component ends up.
    pub fn usage_index(&self) -> BTreeMap<String, Vec<String>> {
        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for product in self.products.iter().filter(|p| p.is_composite()) {
            for link in &product.components {
                index
                    .entry(link.component_id.clone())
                    .or_default()
                    .push(product.id.clone());
            }
        }
        index
    }

    /// Assigns the sell price of a composite (the editor's job, never derived).
    ///
    /// Negative prices are a `CoreError::Validation`.
    pub fn set_sell_price(&mut self, id: &str, price: Money, now: DateTime<Utc>) -> CoreResult<()> {
        let product = self
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if !product.is_composite() {
            return Err(CoreError::NotComposite(id.to_string()));
        }
        validate_price("sellPrice", price)?;

        product.sell_price = price;
        product.sell_price_edited = true;
        self.modified_at = now;
        Ok(())
    }

    /// Recomputes `stats` from `products`.
    pub fn refresh_stats(&mut self) {
        self.stats = CatalogStats::compute(&self.products);
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// Classification of a sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Standalone product sale.
    #[default]
    Original,
    /// Sale of a composite, carries the billed amount.
    Composed,
    /// Component movement already billed through a composite.
    Cumulated,
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineKind::Original => write!(f, "original"),
            LineKind::Composed => write!(f, "composed"),
            LineKind::Cumulated => write!(f, "cumulated"),
        }
    }
}

/// One recorded sale row, normalized by the input adapter.
///
/// Everything but `line_kind` is frozen once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    /// Date as written in the source; the engine never interprets it.
    pub date: String,
    pub product_id: String,
    pub product_name: String,
    /// Negative for returns.
    pub quantity: i64,
    pub unit_price_incl: Money,
    pub line_amount_incl: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Any other source column, passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    #[serde(default)]
    pub line_kind: LineKind,
}

impl SaleLine {
    /// Builds a line with no commercial metadata.
    pub fn new(
        date: impl Into<String>,
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price_incl: Money,
        line_amount_incl: Money,
    ) -> Self {
        SaleLine {
            date: date.into(),
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price_incl,
            line_amount_incl,
            order_ref: None,
            supplier: None,
            cashier: None,
            payment_method: None,
            extra: BTreeMap::new(),
            line_kind: LineKind::Original,
        }
    }

    /// Sets the order reference (builder style).
    pub fn with_order(mut self, order_ref: impl Into<String>) -> Self {
        self.order_ref = Some(order_ref.into());
        self
    }

    /// Zero unit price AND zero amount: the "silent component" signal.
    #[inline]
    pub fn is_zero_priced(&self) -> bool {
        self.unit_price_incl.is_zero() && self.line_amount_incl.is_zero()
    }

    /// Strictly positive unit price AND amount.
    #[inline]
    pub fn is_positively_priced(&self) -> bool {
        self.unit_price_incl.is_positive() && self.line_amount_incl.is_positive()
    }

    /// Grouping key; blank or missing references share one sentinel group.
    pub fn order_key(&self) -> &str {
        match self.order_ref.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r,
            _ => crate::UNGROUPED_ORDER_KEY,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, kind: ProductKind, origin: ProductOrigin) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: id.to_string(),
            category: String::new(),
            purchase_price: Money::zero(),
            sell_price: Money::zero(),
            sell_price_edited: false,
            kind,
            origin,
            components: Vec::new(),
        }
    }

    #[test]
    fn test_placeholder_id() {
        assert_eq!(placeholder_id("Tap"), "TAP");
        assert_eq!(placeholder_id("brass fitting"), "BRASS_FITTING");
        assert_eq!(placeholder_id(" a \t b "), "A_B");
    }

    #[test]
    fn test_placeholder_link_is_zero_priced() {
        let link = ComponentLink::placeholder(" Mystery Part ", 3);
        assert_eq!(link.component_id, "MYSTERY_PART");
        assert_eq!(link.component_name, "Mystery Part");
        assert!(link.purchase_price.is_zero());
        assert!(link.line_cost().is_zero());
    }

    #[test]
    fn test_catalog_stats() {
        let products = vec![
            record("A", ProductKind::Simple, ProductOrigin::Catalog),
            record("B", ProductKind::Composite, ProductOrigin::Merged),
            record("C", ProductKind::Composite, ProductOrigin::CompositionDefinition),
        ];
        let stats = CatalogStats::compute(&products);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.simple, 1);
        assert_eq!(stats.composite, 2);
        assert_eq!(stats.by_origin.catalog, 1);
        assert_eq!(stats.by_origin.merged, 1);
        assert_eq!(stats.by_origin.composition_definition, 1);
    }

    #[test]
    fn test_order_key_sentinel() {
        let line = SaleLine::new("2024-01-01", "A", "A", 1, Money::zero(), Money::zero());
        assert_eq!(line.order_key(), crate::UNGROUPED_ORDER_KEY);
        assert_eq!(line.clone().with_order("  ").order_key(), crate::UNGROUPED_ORDER_KEY);
        assert_eq!(line.with_order("T-1").order_key(), "T-1");
    }

    #[test]
    fn test_raw_component_accepts_both_encodings() {
        let json = r#"[{"name": "Tap", "quantity": 2}, "Bowl (1)"]"#;
        let parsed: Vec<RawComponent> = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed[0],
            RawComponent::Structured {
                name: "Tap".to_string(),
                quantity: 2
            }
        );
        assert_eq!(parsed[1], RawComponent::Encoded("Bowl (1)".to_string()));
    }

    #[test]
    fn test_raw_component_keeps_unreadable_entries() {
        let json = r#"[{"name": "Basin", "quantity": "1"}, 2.0, {"name": "Tap"}]"#;
        let parsed: Vec<RawComponent> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed.iter().all(|c| matches!(c, RawComponent::Malformed(_))));
    }

    #[test]
    fn test_edited_flag_only_serialized_when_set() {
        let mut kit = record("K", ProductKind::Composite, ProductOrigin::Merged);
        assert!(serde_json::to_value(&kit).unwrap().get("sellPriceEdited").is_none());

        kit.sell_price_edited = true;
        let value = serde_json::to_value(&kit).unwrap();
        assert_eq!(value["sellPriceEdited"], true);
        assert_eq!(serde_json::from_value::<ProductRecord>(value).unwrap(), kit);
    }

    #[test]
    fn test_sale_line_kind_defaults_to_original() {
        let json = r#"{"date":"d","productId":"A","productName":"A","quantity":1,"unitPriceIncl":100,"lineAmountIncl":100}"#;
        let line: SaleLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.line_kind, LineKind::Original);
        assert!(line.order_ref.is_none());
    }
}
