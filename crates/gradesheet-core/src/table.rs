//! Column table - named source columns over a shared row index

use crate::cell::{CellValue, ColumnKind};
use crate::column::{ColumnData, SourceColumn};
use crate::error::{Error, Result};
use crate::name::{validate_identifier, validate_row_key};
use crate::row::RowIndex;

/// An ordered set of source columns sharing one [`RowIndex`]
///
/// Every column holds exactly one cell per row. Adding a row appends an
/// empty cell to every column; adding a column back-fills empty cells for
/// rows it does not mention. Failed operations leave the table unchanged.
#[derive(Debug, Clone, Default)]
pub struct ColumnTable {
    /// Shared row keys
    index: RowIndex,
    /// Columns in insertion order
    columns: Vec<SourceColumn>,
}

impl ColumnTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared row index
    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the table has neither rows nor columns
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.columns.is_empty()
    }

    /// Check if a row exists
    pub fn contains_row(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Check if a column exists
    pub fn contains_column(&self, name: &str) -> bool {
        self.column_position(name).is_some()
    }

    /// Iterate over the columns in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &SourceColumn> {
        self.columns.iter()
    }

    /// Iterate over the column names in insertion order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(SourceColumn::name)
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&SourceColumn> {
        self.columns.iter().find(|column| column.name() == name)
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    /// Add a source column, inferring its kind from the values
    ///
    /// All non-empty values must share one kind; a column without any
    /// non-empty value is a number column. Row keys not yet in the index are
    /// appended to it. Returns the kind the column was created with.
    pub fn add_source_column<I, K, V>(&mut self, name: &str, rows: I) -> Result<ColumnKind>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        let rows = collect_rows(rows)?;

        let mut kind = None;
        for (_, value) in &rows {
            match (kind, value.kind()) {
                (None, found) => kind = found,
                (Some(expected), Some(found)) if expected != found => {
                    return Err(Error::TypeMismatch {
                        column: name.to_string(),
                        expected: expected.as_str(),
                        actual: found.as_str(),
                    });
                }
                _ => {}
            }
        }

        let kind = kind.unwrap_or(ColumnKind::Number);
        self.insert_column(name, kind, rows)?;
        Ok(kind)
    }

    /// Add a source column with an explicit kind
    ///
    /// Every non-empty value must be of `kind`.
    pub fn add_source_column_with_kind<I, K, V>(
        &mut self,
        name: &str,
        kind: ColumnKind,
        rows: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        let rows = collect_rows(rows)?;
        if let Some((_, value)) = rows.iter().find(|(_, value)| !kind.accepts(value)) {
            return Err(Error::TypeMismatch {
                column: name.to_string(),
                expected: kind.as_str(),
                actual: value.type_name(),
            });
        }
        self.insert_column(name, kind, rows)
    }

    fn insert_column(
        &mut self,
        name: &str,
        kind: ColumnKind,
        rows: Vec<(String, CellValue)>,
    ) -> Result<()> {
        validate_identifier(name)?;
        if self.contains_column(name) {
            return Err(Error::name_taken(name));
        }

        // Nothing below can fail, so the table is only touched from here on.
        for (key, _) in &rows {
            if !self.index.contains(key) {
                self.push_row(key.clone());
            }
        }

        let mut data = ColumnData::empty(kind, self.index.len());
        for (key, value) in rows {
            if let Some(position) = self.index.position(&key) {
                data.set(position, value);
            }
        }

        self.columns.push(SourceColumn::new(name, data));
        Ok(())
    }

    /// Add an empty row
    pub fn add_row(&mut self, key: &str) -> Result<()> {
        validate_row_key(key)?;
        if self.index.contains(key) {
            return Err(Error::DuplicateRow(key.to_string()));
        }
        self.push_row(key.to_string());
        Ok(())
    }

    fn push_row(&mut self, key: String) -> usize {
        for column in &mut self.columns {
            column.data_mut().push_empty();
        }
        self.index.push(key)
    }

    /// Get a cell value
    pub fn get(&self, row: &str, column: &str) -> Result<CellValue> {
        let position = self
            .index
            .position(row)
            .ok_or_else(|| Error::RowNotFound(row.to_string()))?;
        let column = self
            .column(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
        Ok(column.get(position))
    }

    /// Set a cell value
    ///
    /// The value must match the kind of an existing column ([`CellValue::Empty`]
    /// clears the cell). An unknown row is added, and an unknown column is
    /// created with the kind of the value.
    pub fn set<V: Into<CellValue>>(&mut self, row: &str, column: &str, value: V) -> Result<()> {
        let value = value.into();
        validate_row_key(row)?;

        match self.column_position(column) {
            Some(column_index) => {
                let kind = self.columns[column_index].kind();
                if !kind.accepts(&value) {
                    return Err(Error::TypeMismatch {
                        column: column.to_string(),
                        expected: kind.as_str(),
                        actual: value.type_name(),
                    });
                }
                let position = match self.index.position(row) {
                    Some(position) => position,
                    None => self.push_row(row.to_string()),
                };
                self.columns[column_index].data_mut().set(position, value);
                Ok(())
            }
            None => {
                let kind = value.kind().ok_or_else(|| Error::TypeMismatch {
                    column: column.to_string(),
                    expected: "number or string",
                    actual: value.type_name(),
                })?;
                self.insert_column(column, kind, vec![(row.to_string(), value)])
            }
        }
    }
}

fn collect_rows<I, K, V>(rows: I) -> Result<Vec<(String, CellValue)>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<CellValue>,
{
    rows.into_iter()
        .map(|(key, value)| {
            let key = key.into();
            validate_row_key(&key)?;
            Ok((key, value.into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lab_table() -> ColumnTable {
        let mut table = ColumnTable::new();
        table
            .add_source_column("lab1", [("lur", 10.0), ("lrg", 12.5)])
            .unwrap();
        table
            .add_source_column("name", [("lur", "Luc")])
            .unwrap();
        table
    }

    #[test]
    fn test_add_source_column_infers_kind() {
        let table = lab_table();
        assert_eq!(table.column("lab1").unwrap().kind(), ColumnKind::Number);
        assert_eq!(table.column("name").unwrap().kind(), ColumnKind::String);
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["lab1", "name"]
        );
    }

    #[test]
    fn test_add_source_column_backfills() {
        let table = lab_table();
        assert_eq!(table.get("lrg", "name").unwrap(), CellValue::Empty);
        assert_eq!(table.get("lur", "name").unwrap(), CellValue::string("Luc"));
    }

    #[test]
    fn test_add_source_column_extends_index() {
        let mut table = lab_table();
        table.add_source_column("exam", [("new", 3)]).unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.get("new", "lab1").unwrap(), CellValue::Empty);
        assert_eq!(table.get("new", "exam").unwrap(), CellValue::Number(3.0));
        assert_eq!(table.get("lur", "exam").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_add_source_column_rejects_mixed_values() {
        let mut table = ColumnTable::new();
        let err = table
            .add_source_column(
                "mixed",
                [("a", CellValue::Number(1.0)), ("b", CellValue::string("x"))],
            )
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn test_add_source_column_all_empty_is_number() {
        let mut table = ColumnTable::new();
        let kind = table
            .add_source_column("blank", [("a", CellValue::Empty)])
            .unwrap();
        assert_eq!(kind, ColumnKind::Number);
    }

    #[test]
    fn test_add_source_column_rejects_bad_names() {
        let mut table = lab_table();
        assert!(matches!(
            table.add_source_column("lab1", [("a", 1.0)]),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            table.add_source_column("2nd", [("a", 1.0)]),
            Err(Error::InvalidName { .. })
        ));
        assert_eq!(table.column_count(), 2);
        assert!(!table.contains_row("a"));
    }

    #[test]
    fn test_add_source_column_rejects_empty_key() {
        let mut table = ColumnTable::new();
        assert_eq!(
            table.add_source_column("lab1", [("", 1.0)]),
            Err(Error::InvalidKey(String::new()))
        );
    }

    #[test]
    fn test_add_source_column_with_kind() {
        let mut table = ColumnTable::new();
        table
            .add_source_column_with_kind("blank", ColumnKind::String, [("a", CellValue::Empty)])
            .unwrap();
        assert_eq!(table.column("blank").unwrap().kind(), ColumnKind::String);

        let err = table
            .add_source_column_with_kind("nums", ColumnKind::Number, [("a", "x")])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "number",
                actual: "string",
                ..
            }
        ));
    }

    #[test]
    fn test_add_row() {
        let mut table = lab_table();
        table.add_row("new").unwrap();

        assert_eq!(table.get("new", "lab1").unwrap(), CellValue::Empty);
        assert_eq!(table.get("lur", "lab1").unwrap(), CellValue::Number(10.0));
        assert_eq!(
            table.add_row("new"),
            Err(Error::DuplicateRow("new".to_string()))
        );
    }

    #[test]
    fn test_set_type_mismatch_leaves_column_unchanged() {
        let mut table = lab_table();
        let err = table.set("lur", "lab1", "ten").unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                column: "lab1".into(),
                expected: "number",
                actual: "string",
            }
        );
        assert_eq!(table.get("lur", "lab1").unwrap(), CellValue::Number(10.0));

        assert!(table.set("lur", "name", 3.0).is_err());
        assert_eq!(table.get("lur", "name").unwrap(), CellValue::string("Luc"));
    }

    #[test]
    fn test_set_creates_rows_and_columns() {
        let mut table = lab_table();
        table.set("xyz", "lab1", 15).unwrap();
        assert_eq!(table.get("xyz", "lab1").unwrap(), CellValue::Number(15.0));
        assert_eq!(table.get("xyz", "name").unwrap(), CellValue::Empty);

        table.set("lur", "info", 12.5).unwrap();
        assert_eq!(table.column("info").unwrap().kind(), ColumnKind::Number);
        assert_eq!(table.get("lrg", "info").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_set_empty_clears_cell() {
        let mut table = lab_table();
        table.set("lur", "lab1", CellValue::Empty).unwrap();
        assert_eq!(table.get("lur", "lab1").unwrap(), CellValue::Empty);

        assert!(matches!(
            table.set("lur", "fresh", CellValue::Empty),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(!table.contains_column("fresh"));
    }

    #[test]
    fn test_get_not_found() {
        let table = lab_table();
        assert_eq!(
            table.get("nobody", "lab1"),
            Err(Error::RowNotFound("nobody".into()))
        );
        assert_eq!(
            table.get("lur", "lab9"),
            Err(Error::ColumnNotFound("lab9".into()))
        );
    }
}
