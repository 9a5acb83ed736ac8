//! # Catalog Unifier
//!
//! Merges the product catalog and the composition definitions into one
//! [`UnifiedCatalog`].
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products ─────► 1. SEED: every row → Simple / Catalog                  │
//! │                     (blank or duplicate ids skipped, first wins)        │
//! │                                                                         │
//! │  compositions ─► 2. PARSE components                                    │
//! │                     {name, quantity} or "name (qty)"                    │
//! │                     malformed entries → warning, dropped                │
//! │                                                                         │
//! │                  3. RESOLVE each name with NameMatcher over the         │
//! │                     catalog records that stay simple                    │
//! │                     hit  → ComponentLink from the record                │
//! │                     miss → placeholder link (zero prices)               │
//! │                                                                         │
//! │                  4. MERGE                                               │
//! │                     id already seeded → upgrade in place: Merged        │
//! │                     new id            → append: CompositionDefinition   │
//! │                                         category "composition"          │
//! │                                                                         │
//! │                  5. DERIVE purchase price = Σ(price × qty)              │
//! │                     sell price is never derived                         │
//! │                                                                         │
//! │                  6. FINGERPRINT the raw composition inputs              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The unifier never mutates its inputs and never fails on row-level
//! problems. Only [`unify_documents`] can fail, when its arguments are not
//! the lists it expects.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::fingerprint::composition_fingerprint;
use crate::matcher::NameMatcher;
use crate::money::Money;
use crate::types::{
    CatalogProduct, CatalogStats, ComponentLink, CompositionDefinition, ProductKind,
    ProductOrigin, ProductRecord, RawComponent, UnifiedCatalog,
};
use crate::validation::validate_component_quantity;
use crate::{COMPOSITION_CATEGORY, SCHEMA_VERSION};

// =============================================================================
// Outcome
// =============================================================================

/// Result of a unification run: the catalog plus its diagnostic trail.
#[derive(Debug, Clone)]
pub struct UnifyOutcome {
    pub catalog: UnifiedCatalog,
    /// Non-fatal anomalies, in the order they were met.
    pub warnings: Vec<String>,
    /// Component names resolved to a catalog product.
    pub resolved_components: usize,
    /// Component names replaced by a placeholder.
    pub placeholder_components: usize,
}

/// A composition after component parsing, before resolution.
struct ParsedComposition {
    id: String,
    name: String,
    components: Vec<(String, u32)>,
}

// =============================================================================
// Unify
// =============================================================================

/// Unifies products and compositions, stamping the catalog with the current time.
pub fn unify(products: &[CatalogProduct], compositions: &[CompositionDefinition]) -> UnifyOutcome {
    unify_at(products, compositions, Utc::now())
}

/// Unifies products and compositions with an explicit timestamp.
pub fn unify_at(
    products: &[CatalogProduct],
    compositions: &[CompositionDefinition],
    now: DateTime<Utc>,
) -> UnifyOutcome {
    let mut warnings = Vec::new();

    if products.is_empty() {
        warn!("Product catalog is empty");
        warnings.push(
            "Product catalog is empty: every component will be a placeholder".to_string(),
        );
    }

    // -------------------------------------------------------------------------
    // 1. Seed
    // -------------------------------------------------------------------------
    let mut records: Vec<ProductRecord> = Vec::with_capacity(products.len() + compositions.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(products.len());

    for (row, product) in products.iter().enumerate() {
        let id = product.id.trim();
        if id.is_empty() {
            warnings.push(format!("Product row {} has no id, skipped", row + 1));
            continue;
        }
        if index.contains_key(id) {
            warnings.push(format!("Duplicate product id '{}' at row {}, skipped", id, row + 1));
            continue;
        }

        let mut record = ProductRecord::from_catalog(product);
        record.id = id.to_string();
        index.insert(record.id.clone(), records.len());
        records.push(record);
    }

    // -------------------------------------------------------------------------
    // 2. Parse compositions
    // -------------------------------------------------------------------------
    let parsed = parse_compositions(compositions, &mut warnings);
    let composite_ids: HashSet<&str> = parsed.iter().map(|c| c.id.as_str()).collect();

    // -------------------------------------------------------------------------
    // 3. Resolve components against records that remain simple
    // -------------------------------------------------------------------------
    let mut resolved_components = 0;
    let mut placeholder_components = 0;

    let planned: Vec<(&ParsedComposition, Vec<ComponentLink>)> = {
        let matcher = NameMatcher::new(
            records
                .iter()
                .filter(|r| !composite_ids.contains(r.id.as_str())),
        );

        parsed
            .iter()
            .map(|composition| {
                let links = composition
                    .components
                    .iter()
                    .map(|(name, quantity)| match matcher.find(name) {
                        Some(hit) => {
                            resolved_components += 1;
                            debug!(
                                composition = %composition.id,
                                component = %name,
                                matched = %hit.record.id,
                                stage = %hit.stage,
                                "Component resolved"
                            );
                            ComponentLink::resolved(hit.record, *quantity)
                        }
                        None => {
                            placeholder_components += 1;
                            let link = ComponentLink::placeholder(name, *quantity);
                            warn!(
                                composition = %composition.id,
                                component = %name,
                                placeholder = %link.component_id,
                                "Component not found in catalog"
                            );
                            warnings.push(format!(
                                "Composition '{}': component '{}' not found in catalog, placeholder {} used",
                                composition.id, name, link.component_id
                            ));
                            link
                        }
                    })
                    .collect();
                (composition, links)
            })
            .collect()
    };

    // -------------------------------------------------------------------------
    // 4. Merge
    // -------------------------------------------------------------------------
    for (composition, links) in planned {
        match index.get(&composition.id) {
            Some(&pos) => {
                let record = &mut records[pos];
                record.kind = ProductKind::Composite;
                record.origin = ProductOrigin::Merged;
                record.components = links;
                if record.name.trim().is_empty() {
                    record.name = composition.name.clone();
                }
            }
            None => {
                index.insert(composition.id.clone(), records.len());
                records.push(ProductRecord {
                    id: composition.id.clone(),
                    name: if composition.name.is_empty() {
                        composition.id.clone()
                    } else {
                        composition.name.clone()
                    },
                    category: COMPOSITION_CATEGORY.to_string(),
                    purchase_price: Money::zero(),
                    sell_price: Money::zero(),
                    sell_price_edited: false,
                    kind: ProductKind::Composite,
                    origin: ProductOrigin::CompositionDefinition,
                    components: links,
                });
            }
        }
    }

    // -------------------------------------------------------------------------
    // 5. Derived cost
    // -------------------------------------------------------------------------
    for record in records.iter_mut().filter(|r| r.is_composite()) {
        record.purchase_price = record.derived_cost();
    }

    // -------------------------------------------------------------------------
    // 6. Fingerprint & stats
    // -------------------------------------------------------------------------
    let stats = CatalogStats::compute(&records);
    let catalog = UnifiedCatalog {
        products: records,
        created_at: now,
        modified_at: now,
        schema_version: SCHEMA_VERSION,
        composition_fingerprint: composition_fingerprint(compositions),
        stats,
    };

    info!(
        total = stats.total,
        simple = stats.simple,
        composite = stats.composite,
        merged = stats.by_origin.merged,
        placeholders = placeholder_components,
        warnings = warnings.len(),
        "Catalog unified"
    );

    UnifyOutcome {
        catalog,
        warnings,
        resolved_components,
        placeholder_components,
    }
}

/// Unifies raw JSON inputs, rejecting anything that is not a list of rows.
///
/// ## Failure Semantics
/// - `products` / `compositions` not an array → `CoreError::Structural`
/// - a row that is not an object or has no `id` → skipped with a warning
/// - any other undecodable row → skipped with a warning
pub fn unify_documents(products: &Value, compositions: &Value) -> CoreResult<UnifyOutcome> {
    let product_rows = expect_array("products", products)?;
    let composition_rows = expect_array("compositions", compositions)?;

    let mut row_warnings = Vec::new();
    let products: Vec<CatalogProduct> = decode_rows("products", product_rows, &mut row_warnings);
    let compositions: Vec<CompositionDefinition> =
        decode_rows("compositions", composition_rows, &mut row_warnings);

    let mut outcome = unify(&products, &compositions);
    row_warnings.append(&mut outcome.warnings);
    outcome.warnings = row_warnings;
    Ok(outcome)
}

// =============================================================================
// Component Parsing
// =============================================================================

fn parse_compositions(
    compositions: &[CompositionDefinition],
    warnings: &mut Vec<String>,
) -> Vec<ParsedComposition> {
    let mut seen = HashSet::new();
    let mut parsed = Vec::with_capacity(compositions.len());

    for composition in compositions {
        let id = composition.id.trim();
        if id.is_empty() {
            warnings.push(format!(
                "Composition '{}' has no id, skipped",
                composition.name.trim()
            ));
            continue;
        }
        if !seen.insert(id.to_string()) {
            warnings.push(format!("Duplicate composition id '{}', skipped", id));
            continue;
        }

        let mut components = Vec::with_capacity(composition.components.len());
        for raw in &composition.components {
            match parse_raw_component(raw) {
                Ok(component) => components.push(component),
                Err(e) => {
                    warn!(composition = %id, error = %e, "Component entry dropped");
                    warnings.push(format!("Composition '{}': {}", id, e));
                }
            }
        }

        if components.is_empty() {
            warnings.push(format!(
                "Composition '{}' has no valid components, not turned into a composite",
                id
            ));
            continue;
        }

        parsed.push(ParsedComposition {
            id: id.to_string(),
            name: composition.name.trim().to_string(),
            components,
        });
    }

    parsed
}

fn parse_raw_component(raw: &RawComponent) -> CoreResult<(String, u32)> {
    match raw {
        RawComponent::Encoded(entry) => parse_encoded_component(entry),
        RawComponent::Structured { name, quantity } => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(invalid_component(name, "empty name"));
            }
            let quantity = validate_component_quantity(*quantity)
                .map_err(|e| invalid_component(name, &e.to_string()))?;
            Ok((trimmed.to_string(), quantity))
        }
        RawComponent::Malformed(value) => {
            let entry = value.to_string();
            let reason = match value.as_object() {
                Some(object) if !object.get("name").is_some_and(Value::is_string) => "missing name",
                Some(object) => match object.get("quantity") {
                    None => "missing quantity",
                    Some(_) => "quantity is not an integer",
                },
                None => "expected {name, quantity} or 'name (quantity)'",
            };
            Err(invalid_component(&entry, reason))
        }
    }
}

/// Parses `"<name> (<quantity>)"`.
///
/// The last parenthesized group is the quantity, so names may contain
/// parentheses themselves.
///
/// ## Example
/// ```rust
/// use kitwise_core::catalog::parse_encoded_component;
///
/// assert_eq!(parse_encoded_component("Tap (large) (2)").unwrap(), ("Tap (large)".to_string(), 2));
/// assert!(parse_encoded_component("Tap x2").is_err());
/// ```
pub fn parse_encoded_component(entry: &str) -> CoreResult<(String, u32)> {
    let inner = entry
        .trim()
        .strip_suffix(')')
        .ok_or_else(|| invalid_component(entry, "expected 'name (quantity)'"))?;
    let open = inner
        .rfind('(')
        .ok_or_else(|| invalid_component(entry, "expected 'name (quantity)'"))?;

    let name = inner[..open].trim();
    let quantity_text = inner[open + 1..].trim();

    if name.is_empty() {
        return Err(invalid_component(entry, "empty name"));
    }
    if quantity_text.is_empty() || !quantity_text.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid_component(entry, "quantity is not an integer"));
    }

    let quantity = quantity_text
        .parse::<i64>()
        .map_err(|_| invalid_component(entry, "quantity out of range"))
        .and_then(|q| {
            validate_component_quantity(q).map_err(|e| invalid_component(entry, &e.to_string()))
        })?;

    Ok((name.to_string(), quantity))
}

fn invalid_component(entry: &str, reason: &str) -> CoreError {
    CoreError::InvalidComponent {
        entry: entry.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Document Conversion
// =============================================================================

impl UnifiedCatalog {
    /// Serializes the catalog to its document form.
    pub fn to_document(&self) -> CoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reads a catalog document, checking the required top-level keys first.
    pub fn from_document(document: &Value) -> CoreResult<Self> {
        let object = document
            .as_object()
            .ok_or_else(|| CoreError::structural("catalog document", "object", describe(document)))?;

        for key in ["products", "schemaVersion", "compositionFingerprint"] {
            if !object.contains_key(key) {
                return Err(CoreError::structural(
                    "catalog document",
                    format!("key `{}`", key),
                    describe(document),
                ));
            }
        }

        expect_array("catalog document products", &object["products"])?;

        let version = object["schemaVersion"].as_u64().unwrap_or(u64::MAX);
        if version > SCHEMA_VERSION as u64 {
            return Err(CoreError::structural(
                "catalog document",
                format!("schemaVersion <= {}", SCHEMA_VERSION),
                describe(&object["schemaVersion"]),
            ));
        }

        let mut catalog: UnifiedCatalog = serde_json::from_value(document.clone())?;
        catalog.refresh_stats();
        Ok(catalog)
    }
}

// =============================================================================
// Shape Helpers
// =============================================================================

fn expect_array<'v>(context: &str, value: &'v Value) -> CoreResult<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| CoreError::structural(context, "array", describe(value)))
}

fn decode_rows<T: serde::de::DeserializeOwned>(
    context: &str,
    rows: &[Value],
    warnings: &mut Vec<String>,
) -> Vec<T> {
    let mut decoded = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let has_id = row
            .as_object()
            .and_then(|o| o.get("id"))
            .map(|id| id.is_string() || id.is_number())
            .unwrap_or(false);
        if !has_id {
            warn!(row = i, context, "Row without id skipped");
            warnings.push(format!("{}[{}] skipped: no id (found {})", context, i, describe(row)));
            continue;
        }

        // Numeric ids are common in spreadsheet exports
        let mut row = row.clone();
        if let Some(id) = row.get("id").filter(|id| id.is_number()).map(|id| id.to_string()) {
            row["id"] = Value::String(id);
        }

        match serde_json::from_value::<T>(row) {
            Ok(item) => decoded.push(item),
            Err(e) => warnings.push(format!("{}[{}] skipped: {}", context, i, e)),
        }
    }

    decoded
}

/// Short human description of a JSON value's shape, for error messages.
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => {
            let preview: String = s.chars().take(32).collect();
            format!("string \"{}\"", preview)
        }
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().take(8).map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
