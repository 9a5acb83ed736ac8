//! # Error Types
//!
//! Domain-specific error types for kitwise-core.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Anomaly Classes                                 │
//! │                                                                         │
//! │  Malformed row          → warning string, row skipped                   │
//! │  (bad "Tap (x)", empty catalog)                                         │
//! │                                                                         │
//! │  Unresolvable reference → placeholder / pass-through, counted           │
//! │  (unknown component, Composed line missing from catalog)                │
//! │                                                                         │
//! │  Structural violation   → CoreError::Structural (THIS FILE)             │
//! │  (not a list, missing top-level key)                                    │
//! │                                                                         │
//! │  Only the last class halts a call. The first two never reach this      │
//! │  module: they are aggregated into the result's warnings.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core engine errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The input does not have the shape the engine requires.
    ///
    /// ## When This Occurs
    /// - `products` or `compositions` is not a JSON array
    /// - A catalog document lacks `products` or `schemaVersion`
    /// - A row is not an object or lacks its `id`
    ///
    /// `found` always describes the offending input shape.
    #[error("Structural violation in {context}: expected {expected}, found {found}")]
    Structural {
        context: String,
        expected: String,
        found: String,
    },

    /// A product id is absent from the unified catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// An operation that only applies to composites was given a simple product.
    #[error("Product {0} is not a composite")]
    NotComposite(String),

    /// A single component entry could not be interpreted.
    #[error("Invalid component '{entry}': {reason}")]
    InvalidComponent { entry: String, reason: String },

    /// A row could be located but not deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a structural violation error.
    pub fn structural(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        CoreError::Structural {
            context: context.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-level validation errors.
///
/// Used by the ingestion adapters before rows reach the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., unparseable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
