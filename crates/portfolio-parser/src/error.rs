use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Section not found: {0}")]
    MissingSection(String),

    #[error("Invalid allocation on line {line}: '{value}'")]
    InvalidAllocation { line: u64, value: String },

    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}
