//! Composition editor document → composition rows.
//!
//! The editor has written two layouts over time:
//! ```text
//! { "id": "KIT-01", "components": [{ "name": "Tap", "quantity": 2 }] }
//! { "id": "KIT-01", "encodedStrings": ["Tap (2)"] }
//! ```
//! Both are folded into `components` here; the engine accepts either entry
//! form inside that list.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use super::{parse_json, read_text, Document};
use crate::error::IngestResult;

const ENCODED_KEY: &str = "encodedStrings";
const COMPONENTS_KEY: &str = "components";

/// Reads a composition JSON file.
pub fn load_compositions_file(path: &Path) -> IngestResult<Document> {
    let source_name = path.display().to_string();
    let text = read_text(path)?;
    load_compositions(&source_name, &text)
}

/// Parses composition JSON text.
pub fn load_compositions(source_name: &str, text: &str) -> IngestResult<Document> {
    let mut value = parse_json(source_name, text)?;
    let mut warnings = Vec::new();

    if let Value::Array(rows) = &mut value {
        for (i, row) in rows.iter_mut().enumerate() {
            if let Value::Object(fields) = row {
                if let Some(encoded) = fields.remove(ENCODED_KEY) {
                    if fields.contains_key(COMPONENTS_KEY) {
                        warnings.push(format!(
                            "{} compositions[{}]: both '{}' and '{}' present, '{}' ignored",
                            source_name, i, COMPONENTS_KEY, ENCODED_KEY, ENCODED_KEY
                        ));
                    } else {
                        fields.insert(COMPONENTS_KEY.to_string(), encoded);
                    }
                }
            }
        }
        debug!(source = source_name, compositions = rows.len(), "Compositions ingested");
    }

    Ok(Document { value, warnings })
}
