//! Product catalog export → product rows.
//!
//! Accepts the catalog as CSV (header synonyms, decimal prices) or as a JSON
//! array already in the engine's shape.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use kitwise_core::validation::{validate_price, validate_product_id};
use kitwise_core::{CatalogProduct, Money};

use super::columns::{first_missing, resolve, ProductField, PRODUCT_COLUMNS};
use super::{cell, csv_reader, normalize_header, parse_json, read_text, Document};
use crate::error::{IngestError, IngestResult};

/// Reads a product file, by extension: `.json` as-is, anything else as CSV.
///
/// JSON rows are already in the engine's shape, so `purchasePrice` and
/// `sellPrice` are integer cents there (`1500` is 15.00). A fractional number
/// does not decode and skips its row with a warning at unification. CSV
/// prices are decimal amounts ("15,00").
pub fn load_products_file(path: &Path) -> IngestResult<Document> {
    let source_name = path.display().to_string();
    let text = read_text(path)?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(Document {
            value: parse_json(&source_name, &text)?,
            warnings: Vec::new(),
        })
    } else {
        load_products_csv(&source_name, &text)
    }
}

/// Parses product CSV text into a JSON array of product rows.
///
/// Blank prices are zero. Unparseable or negative prices and overlong ids
/// skip the row with a warning. Blank ids are left for the unifier to report.
pub fn load_products_csv(source_name: &str, text: &str) -> IngestResult<Document> {
    let mut reader = csv_reader(text);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::csv(source_name, e))?
        .iter()
        .map(normalize_header)
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::Empty(source_name.to_string()));
    }

    let (resolved, _) = resolve(&headers, PRODUCT_COLUMNS);
    if let Some(missing) = first_missing(&resolved, PRODUCT_COLUMNS) {
        return Err(IngestError::MissingColumn {
            source_name: source_name.to_string(),
            column: missing.label.to_string(),
            accepted: missing.synonyms.join(", "),
        });
    }
    let column = |field: ProductField| {
        resolved
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, idx)| *idx)
    };

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let row_number = i + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warnings.push(format!("{} row {}: {}", source_name, row_number, e));
                continue;
            }
        };
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let text = |field| cell(&record, column(field));
        let price = |field, label: &str| -> Result<Money, String> {
            match text(field) {
                Some(raw) => Money::parse_decimal(raw).map_err(|e| format!("{}: {}", label, e)),
                None => Ok(Money::zero()),
            }
        };

        let product = price(ProductField::PurchasePrice, "purchase price").and_then(|purchase| {
            let sell = price(ProductField::SellPrice, "sell price")?;
            let id = text(ProductField::Id).unwrap_or_default();
            if !id.is_empty() {
                validate_product_id(id).map_err(|e| e.to_string())?;
            }
            validate_price("purchase price", purchase).map_err(|e| e.to_string())?;
            validate_price("sell price", sell).map_err(|e| e.to_string())?;
            Ok(CatalogProduct::new(
                id,
                text(ProductField::Name).unwrap_or_default(),
                text(ProductField::Category).unwrap_or_default(),
                purchase,
                sell,
            ))
        });

        match product {
            Ok(product) => {
                rows.push(serde_json::to_value(&product).map_err(|e| IngestError::json(source_name, e))?)
            }
            Err(reason) => {
                warn!(source = source_name, row = row_number, %reason, "Product row skipped");
                warnings.push(format!("{} row {} skipped: {}", source_name, row_number, reason));
            }
        }
    }

    debug!(source = source_name, rows = rows.len(), "Products ingested");
    Ok(Document {
        value: Value::Array(rows),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitwise_core::unify_documents;
    use serde_json::json;

    #[test]
    fn test_csv_rows_feed_the_unifier() {
        let text = "Référence;Désignation;Famille;Prix d'achat;Prix de vente\n\
            TAP-01;Chrome Tap;Taps;15,00;29,90\n\
            SIP-03;Siphon;Waste;3,50;\n";
        let doc = load_products_csv("catalogue.csv", text).unwrap();

        assert!(doc.warnings.is_empty());
        assert_eq!(
            doc.value[0],
            json!({"id": "TAP-01", "name": "Chrome Tap", "category": "Taps", "purchasePrice": 1500, "sellPrice": 2990})
        );
        assert_eq!(doc.value[1]["sellPrice"], json!(0));

        let outcome = unify_documents(&doc.value, &json!([])).unwrap();
        assert_eq!(outcome.catalog.stats.total, 2);
    }

    #[test]
    fn test_bad_price_skips_row() {
        let text = "id,name,cost\nA,Alpha,1.00\nB,Beta,n/a\n";
        let doc = load_products_csv("p.csv", text).unwrap();

        assert_eq!(doc.value.as_array().map(Vec::len), Some(1));
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0].contains("row 3"));
        assert!(doc.warnings[0].contains("purchase price"));
    }

    #[test]
    fn test_negative_price_and_long_id_skip_row() {
        let long_id = "X".repeat(65);
        let text = format!("id,name,cost,price\nA,Alpha,1.00,2.00\nB,Beta,-1.00,2.00\n{},Gamma,1.00,2.00\n", long_id);
        let doc = load_products_csv("p.csv", &text).unwrap();

        assert_eq!(doc.value.as_array().map(Vec::len), Some(1));
        assert_eq!(doc.warnings.len(), 2, "{:?}", doc.warnings);
        assert!(doc.warnings[0].contains("row 3") && doc.warnings[0].contains("purchase price"));
        assert!(doc.warnings[1].contains("row 4") && doc.warnings[1].contains("64"));
    }

    #[test]
    fn test_blank_id_reaches_the_unifier() {
        let doc = load_products_csv("p.csv", "id,name,cost\n,Nameless,1.00\n").unwrap();
        assert!(doc.warnings.is_empty());

        let outcome = unify_documents(&doc.value, &json!([])).unwrap();
        assert_eq!(outcome.catalog.stats.total, 0);
        assert!(outcome.warnings.iter().any(|w| w.contains("no id")));
    }

    #[test]
    fn test_missing_name_column() {
        let err = load_products_csv("p.csv", "id,cost\nA,1\n").unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { ref column, .. } if column == "name"));
    }

    #[test]
    fn test_json_file_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.JSON");
        std::fs::write(&path, r#"{"rows": []}"#).unwrap();

        // Not an array, but that is for the engine to reject
        let doc = load_products_file(&path).unwrap();
        assert_eq!(doc.value, json!({"rows": []}));
        assert!(unify_documents(&doc.value, &json!([])).is_err());
    }

    #[test]
    fn test_json_prices_are_cents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(
            &path,
            r#"[{"id": "A", "name": "Alpha", "purchasePrice": 15}, {"id": "B", "name": "Beta", "purchasePrice": 15.5}]"#,
        )
        .unwrap();

        let doc = load_products_file(&path).unwrap();
        let outcome = unify_documents(&doc.value, &json!([])).unwrap();
        assert_eq!(outcome.catalog.get("A").unwrap().purchase_price, Money::from_cents(15));
        assert!(outcome.catalog.get("B").is_none());
        assert!(outcome.warnings[0].starts_with("products[1] skipped"));
    }

    #[test]
    fn test_invalid_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(&path, "[{").unwrap();
        assert!(matches!(load_products_file(&path), Err(IngestError::Json { .. })));
    }
}
