// src/error.rs
// =============================================================================
// Errors that stop a whole run.
//
// Per-link failures never end up here: a dead link is data, not an error.
// What does end up here is anything that means we can't trust or can't
// write the resource table: unreadable file, wrong columns, clashing ids,
// a failed rename, a broken overrides file.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("the resource table has no header row")]
    MissingHeader,

    #[error("required column '{0}' is missing")]
    MissingColumn(&'static str),

    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("row {row}: empty ID")]
    EmptyId { row: usize },

    #[error("row {row}: ID '{id}' is already used by row {first}")]
    DuplicateId { id: String, row: usize, first: usize },

    #[error("row {row}: invalid {column} value '{value}' (expected TRUE or FALSE)")]
    InvalidFlag {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("no resource with ID '{0}' to update")]
    UnknownId(String),

    #[error("invalid overrides file {}: {source}", .path.display())]
    Overrides {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
