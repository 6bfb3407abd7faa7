//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing, evaluation or ordering
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Function name outside the built-in set
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Operator or function applied to a column of the wrong kind
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    /// Identifier that names no source or computed column
    #[error("Undefined reference: {0}")]
    UndefinedReference(String),

    /// Computed columns that depend on each other
    #[error("Cyclic dependency between computed columns: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
}
