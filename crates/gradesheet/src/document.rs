//! The document façade
//!
//! [`Document`] owns the source columns, the formulas and the metadata of a
//! grade sheet. Mutations only touch stored data; every read evaluates the
//! whole document again, so a read never sees a stale computed value.

use crate::calculation::{evaluate_table, CalculationOptions, DerivedTable, Formula, FormulaMap};
use crate::error::{Error, Result};
use chrono::{Local, NaiveDateTime};
use gradesheet_core::{validate_identifier, CellValue, ColumnKind, ColumnTable};
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A grade sheet: named source and computed columns over string-keyed rows
///
/// # Example
///
/// ```rust
/// use gradesheet::{CellValue, Document};
///
/// let mut doc = Document::new();
/// doc.set("11111", "math", -20.0).unwrap();
/// doc.set("22222", "math", 15.0).unwrap();
/// doc.add_computed_column("prout", "total * 2").unwrap();
/// doc.add_computed_column("total", "abs(math)").unwrap();
///
/// assert_eq!(doc.get("11111", "prout").unwrap(), CellValue::Number(40.0));
/// assert_eq!(doc.column_names(), ["math", "prout", "total"]);
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    course: String,
    code: String,
    date: NaiveDateTime,
    filename: Option<PathBuf>,
    dirty: bool,
    table: ColumnTable,
    formulas: FormulaMap,
    options: CalculationOptions,
}

impl Document {
    /// Create an empty, untitled document dated now
    pub fn new() -> Self {
        Self::with_metadata("Untitled", "", "", Local::now().naive_local())
    }

    /// Create an empty document with the given metadata
    pub fn with_metadata<T, C, K>(title: T, course: C, code: K, date: NaiveDateTime) -> Self
    where
        T: Into<String>,
        C: Into<String>,
        K: Into<String>,
    {
        Self {
            title: title.into(),
            course: course.into(),
            code: code.into(),
            date,
            filename: None,
            dirty: false,
            table: ColumnTable::new(),
            formulas: FormulaMap::new(),
            options: CalculationOptions::default(),
        }
    }

    // === Metadata ===

    /// Document title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Course name
    pub fn course(&self) -> &str {
        &self.course
    }

    /// Course code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Date of the evaluation
    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    /// File the document was last loaded from or saved to
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Check if the document changed since it was last loaded or saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_title<S: Into<String>>(&mut self, title: S) {
        self.title = title.into();
        self.dirty = true;
    }

    pub fn set_course<S: Into<String>>(&mut self, course: S) {
        self.course = course.into();
        self.dirty = true;
    }

    pub fn set_code<S: Into<String>>(&mut self, code: S) {
        self.code = code.into();
        self.dirty = true;
    }

    pub fn set_date(&mut self, date: NaiveDateTime) {
        self.date = date;
        self.dirty = true;
    }

    /// Options used by [`evaluate`](Self::evaluate) and every read
    pub fn calculation_options(&self) -> &CalculationOptions {
        &self.options
    }

    /// Change the options used by [`evaluate`](Self::evaluate) and every read
    pub fn set_calculation_options(&mut self, options: CalculationOptions) {
        self.options = options;
    }

    pub(crate) fn mark_saved(&mut self, path: PathBuf) {
        self.filename = Some(path);
        self.dirty = false;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // === Structure ===

    /// Source column names, then computed column names, each in insertion order
    pub fn column_names(&self) -> Vec<String> {
        self.table
            .column_names()
            .map(str::to_string)
            .chain(self.formulas.keys().cloned())
            .collect()
    }

    /// Row keys in insertion order
    pub fn indexes(&self) -> Vec<String> {
        self.table.index().keys().to_vec()
    }

    /// Check whether a column is computed
    pub fn is_computed(&self, name: &str) -> bool {
        self.formulas.contains_key(name)
    }

    /// Formula text of a computed column
    pub fn formula(&self, name: &str) -> Result<&str> {
        self.formulas
            .get(name)
            .map(Formula::text)
            .ok_or_else(|| Error::FormulaNotFound(name.to_string()))
    }

    /// Computed column names and their formula texts, in insertion order
    pub fn formulas(&self) -> impl Iterator<Item = (&str, &str)> {
        self.formulas
            .iter()
            .map(|(name, formula)| (name.as_str(), formula.text()))
    }

    /// The stored source columns
    pub fn source_table(&self) -> &ColumnTable {
        &self.table
    }

    // === Mutation ===

    /// Add a source column from `(row key, value)` pairs
    ///
    /// The kind is inferred from the values (see
    /// [`ColumnTable::add_source_column`]). Returns the kind.
    pub fn add_source_column<I, K, V>(&mut self, name: &str, rows: I) -> Result<ColumnKind>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        self.check_not_computed(name)?;
        let kind = self.table.add_source_column(name, rows)?;
        self.dirty = true;
        Ok(kind)
    }

    /// Add a source column of a declared kind
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
        self.check_not_computed(name)?;
        self.table.add_source_column_with_kind(name, kind, rows)?;
        self.dirty = true;
        Ok(())
    }

    /// Add a computed column
    ///
    /// The formula must parse; the columns it names are only looked up when
    /// the document is evaluated.
    pub fn add_computed_column(&mut self, name: &str, formula: &str) -> Result<()> {
        validate_identifier(name)?;
        if self.table.contains_column(name) {
            return Err(gradesheet_core::Error::name_taken(name).into());
        }
        self.check_not_computed(name)?;

        let formula = Formula::parse(formula)?;
        self.formulas.insert(name.to_string(), formula);
        self.dirty = true;
        Ok(())
    }

    /// Replace the formula of a computed column
    pub fn set_formula(&mut self, name: &str, formula: &str) -> Result<()> {
        if !self.formulas.contains_key(name) {
            return Err(Error::FormulaNotFound(name.to_string()));
        }
        let formula = Formula::parse(formula)?;
        self.formulas.insert(name.to_string(), formula);
        self.dirty = true;
        Ok(())
    }

    /// Add an empty row
    pub fn add_row(&mut self, key: &str) -> Result<()> {
        self.table.add_row(key)?;
        self.dirty = true;
        Ok(())
    }

    /// Write a cell
    ///
    /// The value must match the kind of an existing source column. An unknown
    /// row is added; an unknown column becomes a source column of the value's
    /// kind. Cells of computed columns cannot be written.
    pub fn set<V: Into<CellValue>>(&mut self, row: &str, column: &str, value: V) -> Result<()> {
        if self.is_computed(column) {
            return Err(Error::ReadOnlyColumn(column.to_string()));
        }
        self.table.set(row, column, value)?;
        self.dirty = true;
        Ok(())
    }

    fn check_not_computed(&self, name: &str) -> Result<()> {
        if self.is_computed(name) {
            Err(gradesheet_core::Error::name_taken(name).into())
        } else {
            Ok(())
        }
    }

    // === Evaluation ===

    /// Evaluate every computed column with the document's options
    pub fn evaluate(&self) -> Result<DerivedTable> {
        self.evaluate_with(&self.options)
    }

    /// Evaluate every computed column with explicit options
    pub fn evaluate_with(&self, options: &CalculationOptions) -> Result<DerivedTable> {
        Ok(evaluate_table(&self.table, &self.formulas, options)?)
    }

    /// Row key → value for one column, after evaluation
    pub fn column(&self, name: &str) -> Result<IndexMap<String, CellValue>> {
        self.evaluate()?
            .column_values(name)
            .ok_or_else(|| gradesheet_core::Error::ColumnNotFound(name.to_string()).into())
    }

    /// Column name → value for one row, after evaluation
    pub fn index(&self, row: &str) -> Result<IndexMap<String, CellValue>> {
        self.evaluate()?
            .row_values(row)
            .ok_or_else(|| gradesheet_core::Error::RowNotFound(row.to_string()).into())
    }

    /// A single evaluated cell
    pub fn get(&self, row: &str, column: &str) -> Result<CellValue> {
        Ok(self.evaluate()?.get(row, column)?)
    }

    /// Kind of a column after evaluation
    pub fn column_type(&self, name: &str) -> Result<ColumnKind> {
        self.evaluate()?
            .kind(name)
            .ok_or_else(|| gradesheet_core::Error::ColumnNotFound(name.to_string()).into())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.evaluate() {
            Ok(table) => write!(f, "{}", table),
            Err(e) => write!(f, "<evaluation failed: {}>", e),
        }
    }
}
