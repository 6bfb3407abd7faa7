//! Cell-related types
//!
//! This module contains:
//! - [`CellValue`] - The value stored in (or computed for) a cell
//! - [`ColumnKind`] - The kind shared by every non-empty value of a column

mod value;

pub use value::{CellValue, ColumnKind};
