//! # Composition Fingerprint
//!
//! Staleness digest over the composition inputs of a unification run.
//!
//! ## What It Is (and Is Not)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ordered [(id, name, rawComponents)]                                    │
//! │       │                                                                 │
//! │       ▼  canonical JSON (serde_json, field order fixed by the struct)   │
//! │       │                                                                 │
//! │       ▼  SHA-256 → hex                                                  │
//! │                                                                         │
//! │  "c0ffee..."  == stored?  → inputs unchanged, skip re-save              │
//! │               != stored?  → re-unify / overwrite                        │
//! │                                                                         │
//! │  Answers "did the composition inputs change since last time?" only.    │
//! │  Product catalog rows are NOT part of the digest. Reordering           │
//! │  compositions changes it.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{CompositionDefinition, RawComponent};

/// Version prefix so a future digest change is visible in stored snapshots.
const FINGERPRINT_PREFIX: &str = "v1:";

#[derive(Serialize)]
struct FingerprintEntry<'a> {
    id: &'a str,
    name: &'a str,
    components: &'a [RawComponent],
}

/// Computes the fingerprint of an ordered composition list.
///
/// ## Example
/// ```rust
/// use kitwise_core::{fingerprint::composition_fingerprint, CompositionDefinition};
///
/// let a = vec![CompositionDefinition::from_encoded("K1", "Kit", ["Tap (1)"])];
/// let b = vec![CompositionDefinition::from_encoded("K1", "Kit", ["Tap (2)"])];
/// assert_eq!(composition_fingerprint(&a), composition_fingerprint(&a));
/// assert_ne!(composition_fingerprint(&a), composition_fingerprint(&b));
/// ```
pub fn composition_fingerprint(compositions: &[CompositionDefinition]) -> String {
    let entries: Vec<FingerprintEntry<'_>> = compositions
        .iter()
        .map(|c| FingerprintEntry {
            id: &c.id,
            name: &c.name,
            components: &c.components,
        })
        .collect();

    // Serializing plain strings, integers and vecs cannot fail
    let canonical = serde_json::to_vec(&entries).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    format!("{}{}", FINGERPRINT_PREFIX, hex::encode(hasher.finalize()))
}

// =============================================================================
// Unit Tests
// =============================================================================
