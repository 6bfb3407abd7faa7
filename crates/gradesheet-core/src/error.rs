//! Error types for gradesheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gradesheet-core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Column name is not an identifier or collides with an existing column
    #[error("Invalid column name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Row key is not usable as an index entry
    #[error("Invalid row key {0:?}: row keys must be non-empty strings")]
    InvalidKey(String),

    /// Value kind does not match the column kind
    #[error("Type mismatch in column `{column}`: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Row key already present in the index
    #[error("Row already exists: {0}")]
    DuplicateRow(String),

    /// Row key not present in the index
    #[error("Row not found: {0}")]
    RowNotFound(String),

    /// Column name not present in the table
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

impl Error {
    /// Create an [`Error::InvalidName`] for a name that is already taken
    pub fn name_taken<S: Into<String>>(name: S) -> Self {
        Error::InvalidName {
            name: name.into(),
            reason: "a column with this name already exists",
        }
    }
}
