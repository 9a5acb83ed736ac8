//! # Sale Classifier
//!
//! Tags every sale line as Original, Composed or Cumulated.
//!
//! This is a best-effort heuristic, not a guarantee: point-of-sale exports
//! rarely say which lines are bundles. The cascade below is applied in this
//! exact order and the first matching rule wins.
//!
//! ## Rule Cascade
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0. index lines by order key (missing ref → one shared sentinel group)  │
//! │                                                                         │
//! │  1. productId ∈ known composites                      → Composed        │
//! │  2. another line of the same order is zero-priced                      │
//! │     AND this line has price > 0 and amount > 0        → Composed        │
//! │  3. productId contains '_'                            → Cumulated       │
//! │  4. price == 0 AND amount == 0                        → Cumulated       │
//! │  5. otherwise                                         → Original        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules 2 and 4 can disagree with rule 3 on synthetic data. The cascade
//! order settles it and is not reinterpreted here.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::types::{LineKind, SaleLine};

/// The rule of the cascade that decided a line's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationRule {
    KnownComposite,
    SilentSibling,
    SyntheticId,
    ZeroPriced,
    Fallback,
}

impl ClassificationRule {
    /// Kind assigned when this rule fires.
    pub fn kind(self) -> LineKind {
        match self {
            ClassificationRule::KnownComposite | ClassificationRule::SilentSibling => {
                LineKind::Composed
            }
            ClassificationRule::SyntheticId | ClassificationRule::ZeroPriced => {
                LineKind::Cumulated
            }
            ClassificationRule::Fallback => LineKind::Original,
        }
    }
}

/// Classifies every line, returning a same-length copy with `line_kind` set.
///
/// ## Example
/// ```rust
/// use std::collections::HashSet;
/// use kitwise_core::{classify, LineKind, Money, SaleLine};
///
/// let lines = vec![
///     SaleLine::new("2024-05-02", "KIT-01", "Sink kit", 1, Money::from_cents(9900), Money::from_cents(9900)),
///     SaleLine::new("2024-05-02", "TAP-01", "Chrome tap", 1, Money::from_cents(2990), Money::from_cents(2990)),
/// ];
/// let composites: HashSet<String> = ["KIT-01".to_string()].into_iter().collect();
///
/// let kinds: Vec<LineKind> = classify(&lines, &composites).iter().map(|l| l.line_kind).collect();
/// assert_eq!(kinds, vec![LineKind::Composed, LineKind::Original]);
/// ```
pub fn classify(lines: &[SaleLine], known_composites: &HashSet<String>) -> Vec<SaleLine> {
    // Zero-priced lines per order group
    let mut silent_per_order: HashMap<&str, usize> = HashMap::new();
    for line in lines.iter().filter(|l| l.is_zero_priced()) {
        *silent_per_order.entry(line.order_key()).or_default() += 1;
    }

    let mut counts: HashMap<LineKind, usize> = HashMap::new();

    let classified: Vec<SaleLine> = lines
        .iter()
        .map(|line| {
            let silent = silent_per_order.get(line.order_key()).copied().unwrap_or(0);
            let own = usize::from(line.is_zero_priced());
            let rule = decide(line, known_composites, silent > own);

            let mut out = line.clone();
            out.line_kind = rule.kind();
            *counts.entry(out.line_kind).or_default() += 1;
            out
        })
        .collect();

    debug!(
        lines = classified.len(),
        original = counts.get(&LineKind::Original).copied().unwrap_or(0),
        composed = counts.get(&LineKind::Composed).copied().unwrap_or(0),
        cumulated = counts.get(&LineKind::Cumulated).copied().unwrap_or(0),
        "Sale lines classified"
    );

    classified
}

/// Applies the cascade to one line.
///
/// `has_silent_sibling` is true when another line of the same order has
/// zero unit price and zero amount.
pub fn decide(
    line: &SaleLine,
    known_composites: &HashSet<String>,
    has_silent_sibling: bool,
) -> ClassificationRule {
    if known_composites.contains(&line.product_id) {
        ClassificationRule::KnownComposite
    } else if has_silent_sibling && line.is_positively_priced() {
        ClassificationRule::SilentSibling
    } else if line.product_id.contains('_') {
        ClassificationRule::SyntheticId
    } else if line.is_zero_priced() {
        ClassificationRule::ZeroPriced
    } else {
        ClassificationRule::Fallback
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
