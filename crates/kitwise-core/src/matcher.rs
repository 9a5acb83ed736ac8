//! # Fuzzy Name Matcher
//!
//! Resolves a free-text component name to a catalog record.
//!
//! ## Cascade
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  query: "  Chrome TAP "  →  normalized: "chrome tap"                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Exact         candidate == query                 ── hit? return     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. Contains      candidate contains query           ── hit? return     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Contained     query contains candidate           ── hit? return     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. Tokens        ≥ 2 shared tokens (len > 2)        ── hit? return     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  None → caller synthesizes a placeholder component                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage scans the whole candidate list before the next stage starts,
//! and the first candidate in list order wins within a stage. Results are
//! only reproducible if the candidate order is.

use tracing::trace;

use crate::types::ProductRecord;

/// Tokens must be strictly longer than this (in chars) to count.
const MIN_TOKEN_LEN: usize = 2;

/// Shared tokens required by the last stage.
const MIN_SHARED_TOKENS: usize = 2;

// =============================================================================
// Match Result
// =============================================================================

/// Which cascade stage produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStage {
    Exact,
    CandidateContainsQuery,
    QueryContainsCandidate,
    TokenOverlap,
}

impl std::fmt::Display for MatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStage::Exact => write!(f, "exact"),
            MatchStage::CandidateContainsQuery => write!(f, "candidate_contains_query"),
            MatchStage::QueryContainsCandidate => write!(f, "query_contains_candidate"),
            MatchStage::TokenOverlap => write!(f, "token_overlap"),
        }
    }
}

/// A successful match.
#[derive(Debug, Clone, Copy)]
pub struct NameMatch<'a> {
    pub record: &'a ProductRecord,
    pub stage: MatchStage,
}

// =============================================================================
// Name Matcher
// =============================================================================

struct Candidate<'a> {
    record: &'a ProductRecord,
    normalized: String,
    tokens: Vec<String>,
}

/// Pre-normalized candidate set, reusable across many queries.
///
/// ## Usage
/// ```rust
/// use kitwise_core::{CatalogProduct, MatchStage, Money, NameMatcher, ProductRecord};
///
/// let records: Vec<ProductRecord> = ["Blue Widget", "Widget"]
///     .iter()
///     .enumerate()
///     .map(|(i, n)| ProductRecord::from_catalog(&CatalogProduct::new(i.to_string(), *n, "", Money::zero(), Money::zero())))
///     .collect();
///
/// let matcher = NameMatcher::new(&records);
/// let hit = matcher.find("widget").unwrap();
/// assert_eq!(hit.record.name, "Widget");
/// assert_eq!(hit.stage, MatchStage::Exact);
/// ```
pub struct NameMatcher<'a> {
    candidates: Vec<Candidate<'a>>,
}

impl<'a> NameMatcher<'a> {
    /// Builds a matcher over candidates, keeping their order.
    ///
    /// Candidates with a blank name are ignored: they would otherwise be
    /// "contained" in every query.
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ProductRecord>,
    {
        let candidates = records
            .into_iter()
            .filter_map(|record| {
                let normalized = normalize(&record.name);
                if normalized.is_empty() {
                    return None;
                }
                let tokens = tokenize(&normalized);
                Some(Candidate {
                    record,
                    normalized,
                    tokens,
                })
            })
            .collect();

        NameMatcher { candidates }
    }

    /// Number of usable candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Runs the cascade for one query.
    pub fn find(&self, name: &str) -> Option<NameMatch<'a>> {
        let query = normalize(name);
        if query.is_empty() {
            return None;
        }

        let hit = self
            .first(MatchStage::Exact, |c| c.normalized == query)
            .or_else(|| {
                self.first(MatchStage::CandidateContainsQuery, |c| {
                    c.normalized.contains(query.as_str())
                })
            })
            .or_else(|| {
                self.first(MatchStage::QueryContainsCandidate, |c| {
                    query.contains(c.normalized.as_str())
                })
            })
            .or_else(|| {
                let query_tokens = tokenize(&query);
                if query_tokens.len() < MIN_SHARED_TOKENS {
                    return None;
                }
                self.first(MatchStage::TokenOverlap, |c| {
                    shared_tokens(&query_tokens, &c.tokens) >= MIN_SHARED_TOKENS
                })
            });

        match &hit {
            Some(m) => trace!(query = %query, id = %m.record.id, stage = %m.stage, "Name matched"),
            None => trace!(query = %query, "No candidate matched"),
        }

        hit
    }

    fn first<F>(&self, stage: MatchStage, predicate: F) -> Option<NameMatch<'a>>
    where
        F: Fn(&Candidate<'a>) -> bool,
    {
        self.candidates
            .iter()
            .find(|c| predicate(c))
            .map(|c| NameMatch {
                record: c.record,
                stage,
            })
    }
}

/// One-shot convenience over [`NameMatcher`].
pub fn match_product<'a>(name: &str, candidates: &'a [ProductRecord]) -> Option<&'a ProductRecord> {
    NameMatcher::new(candidates).find(name).map(|m| m.record)
}

// =============================================================================
// Normalization
// =============================================================================

/// Trimmed, lowercased, inner whitespace collapsed.
fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Query tokens that equal, contain, or are contained in some candidate token.
fn shared_tokens(query: &[String], candidate: &[String]) -> usize {
    query
        .iter()
        .filter(|q| {
            candidate
                .iter()
                .any(|c| c == *q || c.contains(q.as_str()) || q.contains(c.as_str()))
        })
        .count()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::CatalogProduct;

    fn records(names: &[&str]) -> Vec<ProductRecord> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                ProductRecord::from_catalog(&CatalogProduct::new(
                    format!("P{}", i),
                    *name,
                    "",
                    Money::zero(),
                    Money::zero(),
                ))
            })
            .collect()
    }

    #[test]
    fn test_exact_is_case_and_space_insensitive() {
        let recs = records(&["Chrome Tap"]);
        let hit = NameMatcher::new(&recs).find("  chrome   TAP ").unwrap();
        assert_eq!(hit.stage, MatchStage::Exact);
    }

    #[test]
    fn test_substring_stage_before_token_stage() {
        let recs = records(&["Blue Widget", "Widget"]);
        // "widget" is not exactly "blue widget", but the exact stage scans
        // every candidate first and finds "Widget".
        let hit = NameMatcher::new(&recs).find("widget").unwrap();
        assert_eq!(hit.record.name, "Widget");
        assert_eq!(hit.stage, MatchStage::Exact);

        // Without an exact candidate, the first containing candidate wins.
        let recs = records(&["Blue Widget", "Red Widget"]);
        let hit = NameMatcher::new(&recs).find("widget").unwrap();
        assert_eq!(hit.record.name, "Blue Widget");
        assert_eq!(hit.stage, MatchStage::CandidateContainsQuery);
    }

    #[test]
    fn test_query_contains_candidate() {
        let recs = records(&["Basin"]);
        let hit = NameMatcher::new(&recs).find("Ceramic basin 60cm").unwrap();
        assert_eq!(hit.stage, MatchStage::QueryContainsCandidate);
    }

    #[test]
    fn test_token_overlap_needs_two_tokens() {
        let recs = records(&["Mixer tap chrome finish"]);
        let hit = NameMatcher::new(&recs).find("chrome mixer").unwrap();
        assert_eq!(hit.stage, MatchStage::TokenOverlap);

        // Only one token longer than two chars on the query side
        assert!(NameMatcher::new(&recs).find("chrome xy").is_none());
    }

    #[test]
    fn test_token_overlap_accepts_partial_tokens() {
        let recs = records(&["Thermostatic valves pack"]);
        // "valve" ⊂ "valves", "thermostatic" equal
        let hit = NameMatcher::new(&recs).find("valve thermostatic brass").unwrap();
        assert_eq!(hit.stage, MatchStage::TokenOverlap);
    }

    #[test]
    fn test_short_tokens_ignored() {
        let recs = records(&["Kit de pose WC"]);
        assert!(NameMatcher::new(&recs).find("de WC xx").is_none());
    }

    #[test]
    fn test_blank_query_and_blank_candidates() {
        let recs = records(&["", "Tap"]);
        let matcher = NameMatcher::new(&recs);
        assert_eq!(matcher.len(), 1);
        assert!(matcher.find("   ").is_none());
        assert!(matcher.find("Something else").is_none());
    }

    #[test]
    fn test_ties_resolved_by_candidate_order() {
        let recs = records(&["Tap A", "Tap B"]);
        assert_eq!(match_product("tap", &recs).unwrap().id, "P0");
        let reversed: Vec<_> = recs.iter().rev().cloned().collect();
        assert_eq!(match_product("tap", &reversed).unwrap().id, "P1");
    }
}
