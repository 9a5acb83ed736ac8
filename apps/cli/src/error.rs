//! # Ingestion Errors
//!
//! File-level failures of the input adapters. Row-level problems never
//! show up here: they become warnings next to the rows that did parse.

use thiserror::Error;

/// Errors that stop a whole input file from being read.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The file could not be opened or read.
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No header matched any synonym of a required column.
    #[error("{source_name}: missing required column '{column}' (accepted headers: {accepted})")]
    MissingColumn {
        source_name: String,
        column: String,
        accepted: String,
    },

    /// The file has no header row.
    #[error("{0}: file is empty")]
    Empty(String),

    /// Malformed CSV framing.
    #[error("{source_name}: CSV error: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    /// Malformed JSON.
    #[error("{source_name}: invalid JSON: {source}")]
    Json {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl IngestError {
    pub fn csv(source_name: &str, source: csv::Error) -> Self {
        IngestError::Csv {
            source_name: source_name.to_string(),
            source,
        }
    }

    pub fn json(source_name: &str, source: serde_json::Error) -> Self {
        IngestError::Json {
            source_name: source_name.to_string(),
            source,
        }
    }
}

/// Result type for ingestion.
pub type IngestResult<T> = Result<T, IngestError>;
