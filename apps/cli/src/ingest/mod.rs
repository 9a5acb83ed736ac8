//! # Input Adapters
//!
//! Turn spreadsheet exports and editor documents into the normalized shapes
//! the engine consumes.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw bytes ──► sniff delimiter ──► normalize headers ──► synonym table  │
//! │                                                          │              │
//! │                          ┌───────────────────────────────┘              │
//! │                          ▼                                              │
//! │               per row: parse cells ──► SaleLine / CatalogProduct        │
//! │                          │                                              │
//! │                          └── bad cell → row skipped, warning kept       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! File-level problems (unreadable file, missing required column) are
//! [`IngestError`]s. Row-level problems never are.

pub mod columns;
pub mod compositions;
pub mod products;
pub mod sales;

use std::path::Path;

use crate::error::{IngestError, IngestResult};

/// Rows that parsed, plus what was skipped and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested<T> {
    pub rows: Vec<T>,
    pub warnings: Vec<String>,
}

impl<T> Default for Ingested<T> {
    fn default() -> Self {
        Ingested {
            rows: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// A JSON document handed to the engine as-is, plus adapter warnings.
///
/// Shape checks happen in the engine so that structural errors carry the
/// same message whatever the input format was.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub value: serde_json::Value,
    pub warnings: Vec<String>,
}

/// Parses JSON text.
pub fn parse_json(source_name: &str, text: &str) -> IngestResult<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| IngestError::json(source_name, e))
}

/// Reads a whole input file as text.
pub fn read_text(path: &Path) -> IngestResult<String> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::Read {
        path: path.display().to_string(),
        source,
    })?;
    // Exports from older tills are Latin-1; keep what decodes
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Normalizes a header for synonym lookup.
///
/// BOM stripped, lowercased, common Latin accents folded, every run of
/// non-alphanumeric characters collapsed to one space.
///
/// ```text
/// "\u{feff}Quantité "  → "quantite"
/// "N° ticket"          → "n ticket"
/// "Prix_d'achat (HT)"  → "prix d achat ht"
/// ```
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('\u{feff}');
    let mut out = String::with_capacity(trimmed.len());
    let mut pending_space = false;

    for c in trimmed.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(c);
        if folded.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(folded);
        } else {
            pending_space = true;
        }
    }

    out
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Picks the field delimiter from the header line.
///
/// Semicolons win ties: French exports use `;` with `,` as decimal mark.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let count = |d: char| header.matches(d).count();

    let (semicolons, commas, tabs) = (count(';'), count(','), count('\t'));
    if tabs > semicolons && tabs > commas {
        b'\t'
    } else if semicolons >= commas && semicolons > 0 {
        b';'
    } else {
        b','
    }
}

/// CSV reader configured the way every tabular adapter reads.
pub(crate) fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(sniff_delimiter(text))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Trimmed cell at `idx`, `None` when absent or blank.
pub(crate) fn cell<'r>(record: &'r csv::StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("\u{feff}Quantité "), "quantite");
        assert_eq!(normalize_header("N° ticket"), "n ticket");
        assert_eq!(normalize_header("Prix_d'achat (HT)"), "prix d achat ht");
        assert_eq!(normalize_header("  Product   ID "), "product id");
        assert_eq!(normalize_header("Catégorie"), "categorie");
        assert_eq!(normalize_header("---"), "");
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("date;ref;qty\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("date,ref,qty"), b',');
        assert_eq!(sniff_delimiter("date\tref\tqty"), b'\t');
        assert_eq!(sniff_delimiter("single"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_read_text_missing_file() {
        let err = read_text(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, IngestError::Read { .. }));
    }
}
