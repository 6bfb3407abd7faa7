//! Prelude module - common imports for gradesheet users
//!
//! ```rust
//! use gradesheet::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    // Cell and column types
    CellValue,
    ColumnKind,
    DerivedTable,
    // Main types
    Document,
    DocumentSchema,
    // Error types
    Error,
    FormulaError,
    ResolutionStrategy,
    Result,
    // I/O types
    SaveOptions,
};
