//! Document calculation engine
//!
//! Materializes every computed column of a document into a [`DerivedTable`].
//! Nothing is cached: each call starts again from the source columns and the
//! formula texts.
//!
//! # Example
//!
//! ```rust
//! use gradesheet::calculation::{evaluate_table, CalculationOptions, Formula, FormulaMap};
//! use gradesheet::{CellValue, ColumnTable};
//!
//! let mut table = ColumnTable::new();
//! table.add_source_column("lab1", [("lur", 10.0)]).unwrap();
//!
//! let mut formulas = FormulaMap::new();
//! formulas.insert("quad".into(), Formula::parse("twice * 2").unwrap());
//! formulas.insert("twice".into(), Formula::parse("lab1 * 2").unwrap());
//!
//! let derived = evaluate_table(&table, &formulas, &CalculationOptions::default()).unwrap();
//! assert_eq!(derived.evaluation_order(), ["twice", "quad"]);
//! assert_eq!(derived.get("lur", "quad").unwrap(), CellValue::Number(40.0));
//! ```

use gradesheet_core::{CellValue, ColumnData, ColumnKind, ColumnTable, RowIndex};
use gradesheet_formula::{
    column_references, evaluate, parse_formula, DependencyGraph, EvaluationContext, FormulaError,
    FormulaExpr, FormulaResult,
};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, trace};

/// How the evaluation order of computed columns is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionStrategy {
    /// Topological order over the exact dependency graph
    #[default]
    Graph,
    /// Evaluate in insertion order, re-queueing a column whenever it refers to
    /// a computed column that is not materialized yet; give up after n²
    /// attempts for n computed columns
    RetryQueue,
}

/// Options for document calculation
#[derive(Debug, Clone, Default)]
pub struct CalculationOptions {
    /// Strategy used to order computed columns
    pub strategy: ResolutionStrategy,
}

impl CalculationOptions {
    /// Options using the given strategy
    pub fn with_strategy(strategy: ResolutionStrategy) -> Self {
        Self { strategy }
    }
}

/// A computed column definition: the text as written plus its parsed form
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    text: String,
    ast: FormulaExpr,
}

impl Formula {
    /// Parse a formula
    pub fn parse<S: Into<String>>(text: S) -> FormulaResult<Self> {
        let text = text.into();
        let ast = parse_formula(&text)?;
        Ok(Self { text, ast })
    }

    /// The formula as written
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The parsed formula
    pub fn ast(&self) -> &FormulaExpr {
        &self.ast
    }

    /// Column names the formula refers to, in first-appearance order
    pub fn references(&self) -> Vec<String> {
        column_references(&self.ast)
    }
}

/// Computed column name → formula, in insertion order
pub type FormulaMap = IndexMap<String, Formula>;

/// A fully evaluated view of a document
///
/// Holds the row index, every source column and one materialized column per
/// formula. Columns are listed sources first, then computed columns in
/// formula insertion order.
#[derive(Debug, Clone)]
pub struct DerivedTable {
    index: RowIndex,
    columns: IndexMap<String, ColumnData>,
    evaluation_order: Vec<String>,
}

impl DerivedTable {
    /// Row keys in insertion order
    pub fn row_keys(&self) -> &[String] {
        self.index.keys()
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    /// Column names in display order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Get a column's values
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    /// Kind of an evaluated column
    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.columns.get(name).map(ColumnData::kind)
    }

    /// Order in which the computed columns were materialized
    pub fn evaluation_order(&self) -> &[String] {
        &self.evaluation_order
    }

    /// Get a cell value
    pub fn get(&self, row: &str, column: &str) -> gradesheet_core::Result<CellValue> {
        let position = self
            .index
            .position(row)
            .ok_or_else(|| gradesheet_core::Error::RowNotFound(row.to_string()))?;
        let data = self
            .columns
            .get(column)
            .ok_or_else(|| gradesheet_core::Error::ColumnNotFound(column.to_string()))?;
        Ok(data.get(position))
    }

    /// Row key → value for one column
    pub fn column_values(&self, name: &str) -> Option<IndexMap<String, CellValue>> {
        let data = self.columns.get(name)?;
        Some(
            self.index
                .iter()
                .enumerate()
                .map(|(position, key)| (key.to_string(), data.get(position)))
                .collect(),
        )
    }

    /// Column name → value for one row
    pub fn row_values(&self, row: &str) -> Option<IndexMap<String, CellValue>> {
        let position = self.index.position(row)?;
        Some(
            self.columns
                .iter()
                .map(|(name, data)| (name.clone(), data.get(position)))
                .collect(),
        )
    }
}

impl fmt::Display for DerivedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .columns
            .values()
            .map(|data| data.iter().map(|value| display_cell(&value)).collect())
            .collect();

        let key_width = self
            .index
            .iter()
            .map(|key| key.chars().count())
            .max()
            .unwrap_or(0);
        let widths: Vec<usize> = self
            .columns
            .keys()
            .zip(&cells)
            .map(|(name, values)| {
                values
                    .iter()
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:key_width$}", "")?;
        for (name, width) in self.columns.keys().zip(&widths) {
            write!(f, "  {:>width$}", name, width = *width)?;
        }

        for (position, key) in self.index.iter().enumerate() {
            writeln!(f)?;
            write!(f, "{:key_width$}", key)?;
            for ((data, values), width) in self.columns.values().zip(&cells).zip(&widths) {
                match data {
                    ColumnData::Number(_) => write!(f, "  {:>width$}", values[position], width = *width)?,
                    ColumnData::String(_) => write!(f, "  {:<width$}", values[position], width = *width)?,
                }
            }
        }
        Ok(())
    }
}

fn display_cell(value: &CellValue) -> String {
    match value {
        CellValue::Empty => "-".to_string(),
        other => other.to_string(),
    }
}

/// Evaluate every formula over the source columns of `table`
///
/// Fails with [`FormulaError::UndefinedReference`] when a formula names a
/// column that does not exist, and with [`FormulaError::CyclicDependency`]
/// when computed columns depend on each other. Evaluation errors of a single
/// formula (operand kinds, functions) are returned as they are.
pub fn evaluate_table(
    table: &ColumnTable,
    formulas: &FormulaMap,
    options: &CalculationOptions,
) -> FormulaResult<DerivedTable> {
    let mut working = WorkingTable {
        table,
        computed: IndexMap::with_capacity(formulas.len()),
    };

    match options.strategy {
        ResolutionStrategy::Graph => working.calculate_graph(formulas)?,
        ResolutionStrategy::RetryQueue => working.calculate_retry_queue(formulas)?,
    }

    let evaluation_order: Vec<String> = working.computed.keys().cloned().collect();

    let mut columns: IndexMap<String, ColumnData> = table
        .columns()
        .map(|column| (column.name().to_string(), column.data().clone()))
        .collect();
    for name in formulas.keys() {
        if let Some(data) = working.computed.swap_remove(name) {
            columns.insert(name.clone(), data);
        }
    }

    Ok(DerivedTable {
        index: table.index().clone(),
        columns,
        evaluation_order,
    })
}

/// Source columns plus the computed columns materialized so far
struct WorkingTable<'t> {
    table: &'t ColumnTable,
    computed: IndexMap<String, ColumnData>,
}

impl<'t> WorkingTable<'t> {
    fn context(&self) -> EvaluationContext<'_> {
        let mut ctx = EvaluationContext::new(self.table.row_count());
        for column in self.table.columns() {
            ctx.insert(column.name(), column.data());
        }
        for (name, data) in &self.computed {
            ctx.insert(name, data);
        }
        ctx
    }

    fn materialize(&mut self, name: &str, formula: &Formula) -> FormulaResult<()> {
        let data = evaluate(formula.ast(), &self.context())?;
        debug!(column = name, kind = %data.kind(), "materialized computed column");
        self.computed.insert(name.to_string(), data);
        Ok(())
    }

    /// Order formulas with the dependency graph, then evaluate in that order
    fn calculate_graph(&mut self, formulas: &FormulaMap) -> FormulaResult<()> {
        let mut graph = DependencyGraph::new();
        for name in formulas.keys() {
            graph.add_node(name);
        }

        for (name, formula) in formulas {
            for reference in formula.references() {
                if formulas.contains_key(&reference) {
                    graph.add_dependency(&reference, name);
                } else if !self.table.contains_column(&reference) {
                    return Err(FormulaError::UndefinedReference(reference));
                }
            }
        }

        let order = graph
            .topological_order()
            .map_err(FormulaError::CyclicDependency)?;
        debug!(?order, "resolved evaluation order");

        for name in &order {
            if let Some(formula) = formulas.get(name) {
                self.materialize(name, formula)?;
            }
        }
        Ok(())
    }

    /// Evaluate in insertion order, retrying columns whose computed
    /// references are not materialized yet
    fn calculate_retry_queue(&mut self, formulas: &FormulaMap) -> FormulaResult<()> {
        let mut queue: VecDeque<(&String, &Formula)> = formulas.iter().collect();
        let max_attempts = formulas.len() * formulas.len();
        let mut attempts = 0;

        while let Some((name, formula)) = queue.pop_front() {
            if attempts > max_attempts {
                let mut remaining = vec![name.clone()];
                remaining.extend(queue.iter().map(|(name, _)| (*name).clone()));
                return Err(FormulaError::CyclicDependency(remaining));
            }
            attempts += 1;

            match self.materialize(name, formula) {
                Ok(()) => {}
                Err(FormulaError::UndefinedReference(missing)) if formulas.contains_key(&missing) => {
                    trace!(column = %name, waiting_for = %missing, "re-queued computed column");
                    queue.push_back((name, formula));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
