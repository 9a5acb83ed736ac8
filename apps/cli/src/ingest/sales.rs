//! Sales export → [`SaleLine`]s.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use kitwise_core::{Money, SaleLine};

use super::columns::{first_missing, resolve, SaleField, SALE_COLUMNS};
use super::{cell, csv_reader, normalize_header, read_text, Ingested};
use crate::error::{IngestError, IngestResult};

/// Reads a sales CSV file.
pub fn load_sales_file(path: &Path) -> IngestResult<Ingested<SaleLine>> {
    let text = read_text(path)?;
    load_sales(&path.display().to_string(), &text)
}

/// Parses sales CSV text.
///
/// ## Cell Rules
/// - blank unit price → zero (component rows are often left empty)
/// - blank line amount → quantity × unit price
/// - unparseable quantity or amount → row skipped with a warning
/// - unrecognized columns → carried in [`SaleLine::extra`]
pub fn load_sales(source_name: &str, text: &str) -> IngestResult<Ingested<SaleLine>> {
    let mut reader = csv_reader(text);

    let raw_headers = reader
        .headers()
        .map_err(|e| IngestError::csv(source_name, e))?
        .clone();
    let headers: Vec<String> = raw_headers.iter().map(normalize_header).collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::Empty(source_name.to_string()));
    }

    let (resolved, unclaimed) = resolve(&headers, SALE_COLUMNS);
    if let Some(missing) = first_missing(&resolved, SALE_COLUMNS) {
        return Err(IngestError::MissingColumn {
            source_name: source_name.to_string(),
            column: missing.label.to_string(),
            accepted: missing.synonyms.join(", "),
        });
    }
    let column = |field: SaleField| {
        resolved
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, idx)| *idx)
    };

    let mut out = Ingested::default();

    for (i, record) in reader.records().enumerate() {
        let row_number = i + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                out.warnings.push(format!("{} row {}: {}", source_name, row_number, e));
                continue;
            }
        };
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        match parse_row(&record, &column) {
            Ok(mut line) => {
                for &idx in &unclaimed {
                    if let (Some(name), Some(value)) = (raw_headers.get(idx), cell(&record, Some(idx))) {
                        let name = name.trim_start_matches('\u{feff}').trim();
                        if !name.is_empty() {
                            line.extra.insert(name.to_string(), value.to_string());
                        }
                    }
                }
                out.rows.push(line);
            }
            Err(reason) => {
                warn!(source = source_name, row = row_number, %reason, "Sale row skipped");
                out.warnings
                    .push(format!("{} row {} skipped: {}", source_name, row_number, reason));
            }
        }
    }

    debug!(
        source = source_name,
        rows = out.rows.len(),
        skipped = out.warnings.len(),
        "Sales ingested"
    );
    Ok(out)
}

fn parse_row(
    record: &csv::StringRecord,
    column: &impl Fn(SaleField) -> Option<usize>,
) -> Result<SaleLine, String> {
    let text = |field| cell(record, column(field));

    let quantity = match text(SaleField::Quantity) {
        Some(raw) => parse_quantity(raw)?,
        None => return Err("missing quantity".to_string()),
    };

    let unit_price = match text(SaleField::UnitPrice) {
        Some(raw) => Money::parse_decimal(raw).map_err(|e| format!("unit price: {}", e))?,
        None => Money::zero(),
    };

    let line_amount = match text(SaleField::LineAmount) {
        Some(raw) => Money::parse_decimal(raw).map_err(|e| format!("line amount: {}", e))?,
        None => unit_price
            .cents()
            .checked_mul(quantity)
            .map(Money::from_cents)
            .ok_or_else(|| "line amount overflows".to_string())?,
    };

    let owned = |field| text(field).map(str::to_string);

    Ok(SaleLine {
        date: owned(SaleField::Date).unwrap_or_default(),
        product_id: owned(SaleField::ProductId).unwrap_or_default(),
        product_name: owned(SaleField::ProductName).unwrap_or_default(),
        quantity,
        unit_price_incl: unit_price,
        line_amount_incl: line_amount,
        order_ref: owned(SaleField::OrderRef),
        supplier: owned(SaleField::Supplier),
        cashier: owned(SaleField::Cashier),
        payment_method: owned(SaleField::PaymentMethod),
        extra: BTreeMap::new(),
        line_kind: Default::default(),
    })
}

/// Whole-unit quantity; `"2"`, `"-1"`, `"3,00"` are fine, `"1.5"` is not.
pub fn parse_quantity(raw: &str) -> Result<i64, String> {
    if let Ok(q) = raw.trim().parse::<i64>() {
        return Ok(q);
    }
    let as_money = Money::parse_decimal(raw).map_err(|_| format!("quantity '{}' is not a number", raw))?;
    if as_money.cents() % 100 != 0 {
        return Err(format!("quantity '{}' is not a whole number", raw));
    }
    Ok(as_money.cents() / 100)
}
