//! Error types for gradesheet

use gradesheet_formula::FormulaError;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing, evaluating, loading or saving a document
#[derive(Debug, Error)]
pub enum Error {
    /// Column model error (names, row keys, cell kinds, lookups)
    #[error(transparent)]
    Core(#[from] gradesheet_core::Error),

    /// Formula parse, evaluation or ordering error
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// Document data does not match the schema
    #[error("Schema validation failed at `{path}`: {message}")]
    SchemaValidation { path: String, message: String },

    /// Attempt to write a cell of a computed column
    #[error("Cannot assign values to cells of computed column `{0}`")]
    ReadOnlyColumn(String),

    /// Column is not a computed column
    #[error("`{0}` is not a computed column")]
    FormulaNotFound(String),

    /// Row keys are stored inside source columns, so they need at least one
    #[error("Cannot save {0} row(s) without a source column to hold them")]
    RowsWithoutSourceColumn(usize),

    /// Save without a path on a document that was never saved or loaded
    #[error("No filename: pass a path to save the document")]
    MissingFilename,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a schema validation error at a JSON pointer
    pub fn schema<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Error::SchemaValidation {
            path: path.into(),
            message: message.into(),
        }
    }
}
