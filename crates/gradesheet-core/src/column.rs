//! Column types

use crate::cell::{CellValue, ColumnKind};

/// Homogeneous column storage, aligned by position with a [`RowIndex`](crate::RowIndex)
///
/// The variant is chosen when the column is created and never changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Numbers or empty cells
    Number(Vec<Option<f64>>),
    /// Strings or empty cells
    String(Vec<Option<String>>),
}

impl ColumnData {
    /// Create a column of `len` empty cells
    pub fn empty(kind: ColumnKind, len: usize) -> Self {
        match kind {
            ColumnKind::Number => ColumnData::Number(vec![None; len]),
            ColumnKind::String => ColumnData::String(vec![None; len]),
        }
    }

    /// Kind of the column
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Number(_) => ColumnKind::Number,
            ColumnData::String(_) => ColumnKind::String,
        }
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Number(cells) => cells.len(),
            ColumnData::String(cells) => cells.len(),
        }
    }

    /// Check if the column has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at a position (empty when out of range)
    pub fn get(&self, position: usize) -> CellValue {
        match self {
            ColumnData::Number(cells) => cells
                .get(position)
                .copied()
                .flatten()
                .map_or(CellValue::Empty, CellValue::number),
            ColumnData::String(cells) => cells
                .get(position)
                .cloned()
                .flatten()
                .map_or(CellValue::Empty, CellValue::String),
        }
    }

    /// Iterate over the values in row order
    pub fn iter(&self) -> impl Iterator<Item = CellValue> + '_ {
        (0..self.len()).map(move |position| self.get(position))
    }

    /// Append an empty cell
    pub(crate) fn push_empty(&mut self) {
        match self {
            ColumnData::Number(cells) => cells.push(None),
            ColumnData::String(cells) => cells.push(None),
        }
    }

    /// Store a value at an existing position
    ///
    /// The caller checks the kind first; a value of the other kind is ignored
    /// and reported as `false`.
    pub(crate) fn set(&mut self, position: usize, value: CellValue) -> bool {
        match (self, value) {
            (ColumnData::Number(cells), CellValue::Number(n)) => {
                cells[position] = if n.is_nan() { None } else { Some(n) };
                true
            }
            (ColumnData::String(cells), CellValue::String(s)) => {
                cells[position] = Some(s);
                true
            }
            (ColumnData::Number(cells), CellValue::Empty) => {
                cells[position] = None;
                true
            }
            (ColumnData::String(cells), CellValue::Empty) => {
                cells[position] = None;
                true
            }
            _ => false,
        }
    }
}

/// A named column of raw values
#[derive(Debug, Clone, PartialEq)]
pub struct SourceColumn {
    name: String,
    data: ColumnData,
}

impl SourceColumn {
    /// Create a column from its name and data
    pub fn new<S: Into<String>>(name: S, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column kind
    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    /// Column storage
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Value at a row position
    pub fn get(&self, position: usize) -> CellValue {
        self.data.get(position)
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }
}
