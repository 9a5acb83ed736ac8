//! # Validation Module
//!
//! Field validators used by the product adapter, the component parser and
//! price edits, and the row-level sale checks that produce warnings.
//!
//! ## Two Strengths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_*()      → Err(ValidationError)   adapter skips the row       │
//! │  check_sale_line() → Vec<String>            row kept, warning recorded  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::SaleLine;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted product identifier.
pub const MAX_PRODUCT_ID_LEN: usize = 64;

/// Largest accepted component quantity in a composition.
pub const MAX_COMPONENT_QUANTITY: i64 = 10_000;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a product identifier.
///
/// ## Rules
/// - Must not be blank
/// - At most 64 characters
///
/// ## Example
/// ```rust
/// use kitwise_core::validation::validate_product_id;
///
/// assert!(validate_product_id("TAP-01").is_ok());
/// assert!(validate_product_id("  ").is_err());
/// ```
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.chars().count() > MAX_PRODUCT_ID_LEN {
        return Err(ValidationError::InvalidFormat {
            field: "id".to_string(),
            reason: format!("longer than {} characters", MAX_PRODUCT_ID_LEN),
        });
    }

    Ok(())
}

/// Validates the quantity of a structured component entry.
pub fn validate_component_quantity(quantity: i64) -> ValidationResult<u32> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_COMPONENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_COMPONENT_QUANTITY,
        });
    }

    Ok(quantity as u32)
}

/// Validates a catalog price: non-negative.
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.cents() < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Sale Line Checks
// =============================================================================

/// Row-level sanity checks on a sale line. Never rejects.
///
/// ## Warnings
/// - blank product id
/// - zero quantity on a line that is not a zero-priced placeholder
/// - `line_amount_incl` off from `quantity × unit_price_incl` by more than
///   `tolerance`
///
/// ## Example
/// ```rust
/// use kitwise_core::{validation::check_sale_line, Money, SaleLine};
///
/// let line = SaleLine::new("2024-05-02", "TAP-01", "Tap", 2, Money::from_cents(1000), Money::from_cents(1500));
/// let warnings = check_sale_line(&line, Money::from_cents(1));
/// assert_eq!(warnings.len(), 1);
/// ```
pub fn check_sale_line(line: &SaleLine, tolerance: Money) -> Vec<String> {
    let mut warnings = Vec::new();

    if line.product_id.trim().is_empty() {
        warnings.push(format!("'{}' has no product id", line.product_name));
    }

    if line.quantity == 0 && !line.is_zero_priced() {
        warnings.push(format!(
            "{}: zero quantity on a priced line",
            line.product_id
        ));
    }

    match line.unit_price_incl.cents().checked_mul(line.quantity) {
        Some(expected) => {
            let deviation =
                Money::from_cents(line.line_amount_incl.cents().saturating_sub(expected)).abs();
            if deviation > tolerance.abs() {
                warnings.push(format!(
                    "{}: amount {} differs from {} × {} = {}",
                    line.product_id,
                    line.line_amount_incl,
                    line.quantity,
                    line.unit_price_incl,
                    Money::from_cents(expected)
                ));
            }
        }
        None => warnings.push(format!(
            "{}: quantity × unit price overflows",
            line.product_id
        )),
    }

    warnings
}

// =============================================================================
// Unit Tests
// =============================================================================
