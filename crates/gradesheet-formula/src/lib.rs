//! # gradesheet-formula
//!
//! Column formula parser and evaluator for gradesheet.
//!
//! This crate provides:
//! - Formula parsing (text → AST)
//! - Vectorized formula evaluation (AST → whole column)
//! - Built-in elementwise functions (`min`, `max`, `floor`, `ceil`, `round`, `abs`)
//! - A dependency graph for ordering computed columns and finding cycles
//!
//! Formulas reference whole columns by name. `total * 2` doubles every
//! row of `total`; there are no cell addresses.
//!
//! ## Example
//!
//! ```rust
//! use gradesheet_core::ColumnData;
//! use gradesheet_formula::{evaluate, parse_formula, EvaluationContext};
//!
//! let math = ColumnData::Number(vec![Some(-20.0), Some(15.0)]);
//! let mut ctx = EvaluationContext::new(2);
//! ctx.insert("math", &math);
//!
//! let ast = parse_formula("abs(math) * 2").unwrap();
//! let result = evaluate(&ast, &ctx).unwrap();
//! assert_eq!(result, ColumnData::Number(vec![Some(40.0), Some(30.0)]));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use dependency::{column_references, DependencyGraph};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, EvaluationContext};
pub use parser::parse_formula;
