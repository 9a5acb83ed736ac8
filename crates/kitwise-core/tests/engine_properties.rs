//! End-to-end properties of the reconciliation engine.

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use kitwise_core::classifier::{decide, ClassificationRule};
use kitwise_core::fingerprint::composition_fingerprint;
use kitwise_core::pipeline::{run, totals};
use kitwise_core::{
    classify, decompose, match_product, unify, unify_at, CatalogProduct, CompositionDefinition,
    LineKind, MatchStage, Money, NameMatcher, PipelineOptions, ProductKind, ProductOrigin,
    ProductRecord, SaleLine,
};

// =============================================================================
// Fixtures
// =============================================================================

fn product(id: &str, name: &str, purchase: i64, sell: i64) -> CatalogProduct {
    CatalogProduct::new(id, name, "Bathroom", Money::from_cents(purchase), Money::from_cents(sell))
}

fn bathroom_catalog() -> Vec<CatalogProduct> {
    vec![
        product("TAP-01", "Chrome Tap", 1500, 2990),
        product("BWL-02", "Ceramic Basin", 4000, 8900),
        product("SIP-03", "Siphon", 350, 790),
        product("KIT-01", "Sink Kit", 0, 14900),
    ]
}

fn bathroom_compositions() -> Vec<CompositionDefinition> {
    vec![
        CompositionDefinition::from_pairs("KIT-01", "Sink Kit", [("chrome tap", 2), ("Basin", 1)]),
        CompositionDefinition::from_encoded("KIT-02", "Repair Kit", ["Siphon (3)", "Teflon tape (1)"]),
    ]
}

fn sale(id: &str, quantity: i64, unit: i64, order: &str) -> SaleLine {
    SaleLine::new(
        "2024-05-02",
        id,
        id,
        quantity,
        Money::from_cents(unit),
        Money::from_cents(unit * quantity),
    )
    .with_order(order)
}

fn as_records(names: &[&str]) -> Vec<ProductRecord> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| ProductRecord::from_catalog(&product(&format!("P{}", i), n, 0, 0)))
        .collect()
}

// =============================================================================
// Unifier
// =============================================================================

#[test]
fn unify_is_idempotent() {
    let first = unify(&bathroom_catalog(), &bathroom_compositions()).catalog;
    let second = unify(&bathroom_catalog(), &bathroom_compositions()).catalog;

    assert_eq!(first.products, second.products);
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.composition_fingerprint, second.composition_fingerprint);
}

#[test]
fn fingerprint_tracks_component_changes() {
    let base = bathroom_compositions();
    let mut changed = bathroom_compositions();
    changed[1] = CompositionDefinition::from_encoded("KIT-02", "Repair Kit", ["Siphon (4)", "Teflon tape (1)"]);

    assert_ne!(composition_fingerprint(&base), composition_fingerprint(&changed));
    assert_eq!(composition_fingerprint(&base), composition_fingerprint(&bathroom_compositions()));

    let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let a = unify_at(&bathroom_catalog(), &base, now).catalog;
    let b = unify_at(&bathroom_catalog(), &changed, now).catalog;
    assert_ne!(a.composition_fingerprint, b.composition_fingerprint);
}

#[test]
fn merge_keeps_a_single_record() {
    let products = vec![product("A", "Sink", 0, 0)];
    let compositions = vec![CompositionDefinition::from_pairs("A", "", [("Tap", 2)])];

    let catalog = unify(&products, &compositions).catalog;
    let matching: Vec<_> = catalog.products.iter().filter(|p| p.id == "A").collect();

    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].kind, ProductKind::Composite);
    assert_eq!(matching[0].origin, ProductOrigin::Merged);
}

#[test]
fn unified_catalog_invariants_hold() {
    let outcome = unify(&bathroom_catalog(), &bathroom_compositions());
    let catalog = &outcome.catalog;

    let ids: HashSet<&str> = catalog.products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), catalog.products.len());

    for record in &catalog.products {
        assert_eq!(record.is_composite(), !record.components.is_empty(), "{}", record.id);
        if record.is_composite() {
            assert_eq!(record.purchase_price, record.derived_cost());
            assert!(record.components.iter().all(|c| c.quantity >= 1));
        }
    }

    // KIT-01: 2 × 15.00 + 1 × 40.00, catalog sell price kept
    let kit = catalog.get("KIT-01").unwrap();
    assert_eq!(kit.purchase_price.cents(), 7000);
    assert_eq!(kit.sell_price.cents(), 14900);

    // KIT-02: tape is a placeholder, costs nothing
    let repair = catalog.get("KIT-02").unwrap();
    assert_eq!(repair.purchase_price.cents(), 1050);
    assert_eq!(repair.components[1].component_id, "TEFLON_TAPE");
    assert_eq!(outcome.placeholder_components, 1);

    assert_eq!(catalog.stats.total, 5);
    assert_eq!(catalog.stats.composite, 2);
    assert_eq!(catalog.stats.by_origin.merged, 1);
    assert_eq!(catalog.stats.by_origin.composition_definition, 1);
}

// =============================================================================
// Matcher
// =============================================================================

#[test]
fn matcher_cascade_prefers_earlier_stages() {
    // An exact candidate later in the list still beats a substring hit earlier
    let records = as_records(&["Blue Widget", "Widget"]);
    let hit = NameMatcher::new(&records).find("widget").unwrap();
    assert_eq!(hit.record.name, "Widget");
    assert_eq!(hit.stage, MatchStage::Exact);

    // The substring stage answers before token overlap is attempted
    let records = as_records(&["Widget pro max", "Blue Widget"]);
    let hit = NameMatcher::new(&records).find("blue widget").unwrap();
    assert_eq!(hit.stage, MatchStage::Exact);

    let records = as_records(&["Steel widget frame", "Blue Widget deluxe"]);
    let hit = NameMatcher::new(&records).find("blue widget").unwrap();
    assert_eq!(hit.record.name, "Blue Widget deluxe");
    assert_eq!(hit.stage, MatchStage::CandidateContainsQuery);
}

#[test]
fn matcher_is_deterministic_for_a_given_order() {
    let records = as_records(&["Tap chrome A", "Tap chrome B"]);
    let first = match_product("chrome tap", &records).map(|r| r.id.clone());
    for _ in 0..5 {
        assert_eq!(match_product("chrome tap", &records).map(|r| r.id.clone()), first);
    }
}

// =============================================================================
// Classifier
// =============================================================================

#[test]
fn composite_id_with_underscore_is_composed() {
    let lines = vec![sale("KIT_01", 1, 9900, "T-1")];
    let known: HashSet<String> = ["KIT_01".to_string()].into_iter().collect();
    assert_eq!(classify(&lines, &known)[0].line_kind, LineKind::Composed);
}

/// Every combination of the four signals, checked against the cascade order.
#[test]
fn classifier_precedence_is_exhaustive() {
    for mask in 0u8..16 {
        let known_composite = mask & 1 != 0;
        let underscore = mask & 2 != 0;
        let zero_priced = mask & 4 != 0;
        let silent_sibling = mask & 8 != 0;

        let id = if underscore { "KIT_X" } else { "KITX" };
        let unit = if zero_priced { 0 } else { 1000 };
        let line = sale(id, 1, unit, "T-1");
        let known: HashSet<String> = if known_composite {
            [id.to_string()].into_iter().collect()
        } else {
            HashSet::new()
        };

        let expected = if known_composite {
            ClassificationRule::KnownComposite
        } else if silent_sibling && !zero_priced {
            ClassificationRule::SilentSibling
        } else if underscore {
            ClassificationRule::SyntheticId
        } else if zero_priced {
            ClassificationRule::ZeroPriced
        } else {
            ClassificationRule::Fallback
        };
        assert_eq!(decide(&line, &known, silent_sibling), expected, "mask {:04b}", mask);

        // Same outcome through the batch entry point
        let mut lines = vec![line];
        if silent_sibling {
            lines.push(sale("FREE", 1, 0, "T-1"));
        }
        let classified = classify(&lines, &known);
        assert_eq!(classified[0].line_kind, expected.kind(), "mask {:04b}", mask);
    }
}

// =============================================================================
// Decomposer
// =============================================================================

#[test]
fn decomposition_scales_component_quantities() {
    let catalog = unify(&[product("T", "Tap", 100, 200)], &[CompositionDefinition::from_pairs("K", "Kit", [("Tap", 2)])]).catalog;
    let lines = classify(&[sale("K", 3, 5000, "T-9")], &catalog.composite_ids());

    let out = decompose(&lines, &catalog);
    let component = &out.lines[1];
    assert_eq!(component.quantity, 6);
    assert_eq!(component.unit_price_incl, Money::zero());
    assert_eq!(component.line_kind, LineKind::Cumulated);
    assert_eq!(out.added_component_count, 1);
}

#[test]
fn decomposition_never_double_counts() {
    let catalog = unify(&bathroom_catalog(), &bathroom_compositions()).catalog;
    let lines = vec![
        sale("KIT-01", 2, 14900, "T-1"),
        sale("TAP-01", 1, 2990, "T-1"),
        sale("KIT-02", -1, 2500, "T-2"),
        sale("GHOST", 1, 990, "T-3"),
        sale("SIP-03", 4, 790, "T-4"),
    ];

    let report = run(&lines, &catalog, &PipelineOptions::default());

    assert_eq!(
        totals(&report.original_lines).amount_incl,
        totals(&report.decomposed_lines).amount_incl
    );
    assert_eq!(report.stats.lines_imported, 5);
    // KIT-01 → 2 links, KIT-02 → 2 links
    assert_eq!(report.stats.components_added, 4);
    assert_eq!(report.stats.lines_after_decomposition, 9);

    let teflon: i64 = report
        .decomposed_lines
        .iter()
        .filter(|l| l.product_id == "TEFLON_TAPE")
        .map(|l| l.quantity)
        .sum();
    assert_eq!(teflon, -1);
}
