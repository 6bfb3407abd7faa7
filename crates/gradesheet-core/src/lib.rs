//! # gradesheet-core
//!
//! Core data structures for the gradesheet document engine.
//!
//! This crate provides the typed storage underneath a document:
//! - [`CellValue`] - A single cell value (number, string or empty)
//! - [`ColumnKind`] - The fixed kind of a source column
//! - [`SourceColumn`] and [`ColumnData`] - Homogeneous column storage
//! - [`RowIndex`] - The shared, ordered set of row keys
//! - [`ColumnTable`] - Named source columns over one row index
//!
//! ## Example
//!
//! ```rust
//! use gradesheet_core::{CellValue, ColumnKind, ColumnTable};
//!
//! let mut table = ColumnTable::new();
//! let kind = table.add_source_column("lab1", [("lur", 10.0)]).unwrap();
//! assert_eq!(kind, ColumnKind::Number);
//!
//! table.add_row("lrg").unwrap();
//! assert_eq!(table.get("lrg", "lab1").unwrap(), CellValue::Empty);
//! assert_eq!(table.get("lur", "lab1").unwrap(), CellValue::Number(10.0));
//! ```

pub mod cell;
pub mod column;
pub mod error;
pub mod name;
pub mod row;
pub mod table;

// Re-exports for convenience
pub use cell::{CellValue, ColumnKind};
pub use column::{ColumnData, SourceColumn};
pub use error::{Error, Result};
pub use name::{is_identifier, validate_identifier, validate_row_key};
pub use row::RowIndex;
pub use table::ColumnTable;
