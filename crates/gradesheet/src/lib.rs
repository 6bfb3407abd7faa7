//! # gradesheet
//!
//! A grade sheet document: named columns over string-keyed rows, where some
//! columns hold raw values and others are computed from formulas.
//!
//! ## Features
//!
//! - Typed source columns (numbers or strings) sharing one row index
//! - Computed columns defined by formulas such as `round((exam + lab) / 2, 1)`
//! - Evaluation order derived from the formulas, with cycle detection
//! - Schema-validated JSON files that keep row and column order
//!
//! ## Example
//!
//! ```rust
//! use gradesheet::prelude::*;
//!
//! let mut doc = Document::new();
//! doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
//! doc.add_computed_column("quad", "twice * 2").unwrap();
//! doc.add_computed_column("twice", "lab1 * 2").unwrap();
//!
//! assert_eq!(doc.get("lur", "quad").unwrap(), CellValue::Number(40.0));
//!
//! doc.add_row("lrg").unwrap();
//! assert_eq!(doc.index("lrg").unwrap()["lab1"], CellValue::Empty);
//!
//! // Save to file
//! // doc.save(Some(std::path::Path::new("examen.json"))).unwrap();
//! ```

pub mod calculation;
pub mod document;
pub mod error;
pub mod io;
pub mod prelude;
pub mod schema;

// Re-export calculation types
pub use calculation::{CalculationOptions, DerivedTable, Formula, FormulaMap, ResolutionStrategy};
pub use document::Document;
pub use error::{Error, Result};
pub use io::SaveOptions;
pub use schema::{validate_document, DocumentSchema};

// Re-export core types
pub use gradesheet_core::{CellValue, ColumnData, ColumnKind, ColumnTable, RowIndex};

// Re-export formula types
pub use gradesheet_formula::{parse_formula, FormulaError, FormulaExpr};
