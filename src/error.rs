//! Error types for tabalign operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TabalignError>;

#[derive(Error, Debug)]
pub enum TabalignError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ragged row at line {line} of {path}: expected {expected} fields, found {found}")]
    RaggedRow {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate primary key '{key}' in {path}")]
    DuplicateKey { path: PathBuf, key: String },

    #[error("Missing primary key value at line {line} of {path}")]
    MissingKey { path: PathBuf, line: u64 },

    #[error("Column '{column}' not found in header of {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Merge order violated: {message}")]
    MergeOrder { message: String },

    #[error("Invalid delta mode '{mode}' for key '{key}'")]
    InvalidMode { mode: String, key: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{0:#}")]
    Generic(#[from] anyhow::Error),
}

impl TabalignError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn merge_order(msg: impl Into<String>) -> Self {
        Self::MergeOrder {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn missing_column(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            path: path.into(),
            column: column.into(),
        }
    }
}
