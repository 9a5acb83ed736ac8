//! # kitwise-core: Reconciliation & Decomposition Engine
//!
//! This crate is the **heart** of Kitwise. It merges a flat product catalog
//! with user-authored compositions (bundles of components) and decomposes
//! recorded sales of composite products into their parts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kitwise Data Flow                                │
//! │                                                                         │
//! │  product rows ──┐                                                       │
//! │                 ├──► unify() ──► UnifiedCatalog ──► kitwise-store       │
//! │  compositions ──┘      │                 │                              │
//! │                        ▼                 │ composite ids / links        │
//! │                  NameMatcher             ▼                              │
//! │                                                                         │
//! │  sale rows ──► classify() ──► decompose() ──► DecompositionReport       │
//! │                                                                         │
//! │   NO I/O • NO DATABASE • NO FILES • PURE FUNCTIONS                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (ProductRecord, SaleLine, UnifiedCatalog, ...)
//! - [`money`] - Integer money and tax rates
//! - [`matcher`] - Four-stage fuzzy name matching
//! - [`catalog`] - Catalog unification
//! - [`fingerprint`] - Composition staleness digest
//! - [`classifier`] - Sale line classification
//! - [`decomposer`] - Composite sale expansion
//! - [`pipeline`] - Validate, classify and decompose in one pass
//! - [`validation`] - Row-level checks that produce warnings
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use kitwise_core::{unify, CatalogProduct, CompositionDefinition, Money, ProductKind};
//!
//! let products = vec![CatalogProduct::new("TAP-01", "Chrome Tap", "Taps", Money::from_cents(1500), Money::from_cents(2990))];
//! let compositions = vec![CompositionDefinition::from_encoded("KIT-01", "Sink Kit", ["Chrome Tap (2)"])];
//!
//! let outcome = unify(&products, &compositions);
//! let kit = outcome.catalog.get("KIT-01").unwrap();
//! assert_eq!(kit.kind, ProductKind::Composite);
//! assert_eq!(kit.purchase_price.cents(), 3000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod classifier;
pub mod decomposer;
pub mod error;
pub mod fingerprint;
pub mod matcher;
pub mod money;
pub mod pipeline;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{unify, unify_at, unify_documents, UnifyOutcome};
pub use classifier::classify;
pub use decomposer::{decompose, Decomposition};
pub use error::{CoreError, CoreResult, ValidationError};
pub use matcher::{match_product, MatchStage, NameMatch, NameMatcher};
pub use money::{Money, TaxRate};
pub use pipeline::{DecompositionReport, DecompositionStats, PipelineOptions};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Version of the unified catalog document layout.
///
/// Bumped whenever a persisted catalog can no longer be read by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// Category forced onto composites that only exist as compositions.
pub const COMPOSITION_CATEGORY: &str = "composition";

/// Order key used for sale lines that carry no order reference.
pub const UNGROUPED_ORDER_KEY: &str = "__no_order__";

/// Default tolerance between `line_amount_incl` and `quantity × unit_price_incl`.
pub const DEFAULT_AMOUNT_TOLERANCE_CENTS: i64 = 1;
