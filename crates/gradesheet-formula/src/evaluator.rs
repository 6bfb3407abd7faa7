//! Formula evaluator
//!
//! Evaluates formula ASTs over whole columns. Every node produces a
//! [`ColumnData`] with one entry per row; literals are broadcast.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use ahash::AHashMap;
use gradesheet_core::ColumnData;
use std::cmp::Ordering;
use std::sync::OnceLock;
use tracing::trace;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Columns visible to a formula, all of length `row_count`
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    row_count: usize,
    columns: AHashMap<&'a str, &'a ColumnData>,
}

impl<'a> EvaluationContext<'a> {
    /// Create an empty context for a table with `row_count` rows
    pub fn new(row_count: usize) -> Self {
        Self {
            row_count,
            columns: AHashMap::new(),
        }
    }

    /// Make a column visible under `name`
    pub fn insert(&mut self, name: &'a str, data: &'a ColumnData) {
        self.columns.insert(name, data);
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&'a ColumnData> {
        self.columns.get(name).copied()
    }

    /// Number of rows every result must have
    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

/// Evaluate a formula expression to a whole column
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<ColumnData> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => {
            let value = if n.is_nan() { None } else { Some(*n) };
            Ok(ColumnData::Number(vec![value; ctx.row_count]))
        }
        FormulaExpr::String(s) => Ok(ColumnData::String(vec![Some(s.clone()); ctx.row_count])),

        // === References ===
        FormulaExpr::ColumnRef(name) => ctx
            .column(name)
            .cloned()
            .ok_or_else(|| FormulaError::UndefinedReference(name.clone())),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<ColumnData> {
    // Evaluate operands first
    let left_val = evaluate(left, ctx)?;
    let right_val = evaluate(right, ctx)?;

    match (&left_val, &right_val) {
        (ColumnData::Number(l), ColumnData::Number(r)) => {
            if op.is_comparison() {
                Ok(zip_numbers(l, r, |a, b| {
                    compare_result(op, a.partial_cmp(&b))
                }))
            } else {
                Ok(zip_numbers(l, r, |a, b| arithmetic(op, a, b)))
            }
        }

        (ColumnData::String(l), ColumnData::String(r)) => {
            if op.is_comparison() {
                let result = l
                    .iter()
                    .zip(r)
                    .map(|pair| match pair {
                        (Some(a), Some(b)) => Some(compare_result(op, Some(a.cmp(b)))),
                        _ => None,
                    })
                    .collect();
                Ok(ColumnData::Number(result))
            } else if op == BinaryOperator::Add {
                let result = l
                    .iter()
                    .zip(r)
                    .map(|pair| match pair {
                        (Some(a), Some(b)) => Some(format!("{}{}", a, b)),
                        _ => None,
                    })
                    .collect();
                Ok(ColumnData::String(result))
            } else {
                Err(FormulaError::InvalidOperand(format!(
                    "operator {} is not defined for strings",
                    op
                )))
            }
        }

        _ => Err(FormulaError::InvalidOperand(format!(
            "cannot apply {} to {} and {}",
            op,
            kind_name(&left_val),
            kind_name(&right_val)
        ))),
    }
}

/// Combine two numeric columns; null in gives null out, NaN out is stored as null
fn zip_numbers(
    left: &[Option<f64>],
    right: &[Option<f64>],
    f: impl Fn(f64, f64) -> f64,
) -> ColumnData {
    let result = left
        .iter()
        .zip(right)
        .map(|pair| match pair {
            (Some(a), Some(b)) => Some(f(*a, *b)).filter(|value| !value.is_nan()),
            _ => None,
        })
        .collect();
    ColumnData::Number(result)
}

fn arithmetic(op: BinaryOperator, a: f64, b: f64) -> f64 {
    match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => a / b,
        BinaryOperator::FloorDivide => (a / b).floor(),
        BinaryOperator::Modulo => {
            // Result takes the sign of the divisor
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            }
        }
        BinaryOperator::Power => a.powf(b),
        _ => f64::NAN,
    }
}

fn compare_result(op: BinaryOperator, ordering: Option<Ordering>) -> f64 {
    let holds = match (op, ordering) {
        (BinaryOperator::Equal, Some(o)) => o == Ordering::Equal,
        (BinaryOperator::NotEqual, Some(o)) => o != Ordering::Equal,
        (BinaryOperator::NotEqual, None) => true,
        (BinaryOperator::LessThan, Some(o)) => o == Ordering::Less,
        (BinaryOperator::LessEqual, Some(o)) => o != Ordering::Greater,
        (BinaryOperator::GreaterThan, Some(o)) => o == Ordering::Greater,
        (BinaryOperator::GreaterEqual, Some(o)) => o != Ordering::Less,
        _ => false,
    };
    if holds {
        1.0
    } else {
        0.0
    }
}

fn kind_name(data: &ColumnData) -> &'static str {
    match data {
        ColumnData::Number(_) => "numbers",
        ColumnData::String(_) => "strings",
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<ColumnData> {
    match evaluate(operand, ctx)? {
        ColumnData::Number(values) => Ok(ColumnData::Number(match op {
            UnaryOperator::Negate => values.into_iter().map(|v| v.map(|n| -n)).collect(),
            UnaryOperator::Plus => values,
        })),
        ColumnData::String(_) => Err(FormulaError::InvalidOperand(format!(
            "unary {} is not defined for strings",
            op.symbol()
        ))),
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<ColumnData> {
    let registry = get_function_registry();

    let func = registry
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    // Check argument count
    if args.len() < func.min_args {
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected: format!("at least {}", func.min_args),
            actual: args.len(),
        });
    }

    if let Some(max) = func.max_args {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    // Evaluate arguments
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(evaluate(arg, ctx)?);
    }

    trace!(function = name, args = evaluated_args.len(), "calling function");
    (func.implementation)(&evaluated_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;

    fn numbers(values: &[Option<f64>]) -> ColumnData {
        ColumnData::Number(values.to_vec())
    }

    fn strings(values: &[Option<&str>]) -> ColumnData {
        ColumnData::String(values.iter().map(|v| v.map(String::from)).collect())
    }

    fn eval_with(formula: &str, columns: &[(&str, &ColumnData)]) -> FormulaResult<ColumnData> {
        let row_count = columns.first().map_or(1, |(_, data)| data.len());
        let mut ctx = EvaluationContext::new(row_count);
        for (name, data) in columns {
            ctx.insert(name, data);
        }
        let ast = parse_formula(formula)?;
        evaluate(&ast, &ctx)
    }

    fn eval(formula: &str) -> FormulaResult<ColumnData> {
        eval_with(formula, &[])
    }

    #[test]
    fn test_evaluate_literals_broadcast() {
        let ctx = EvaluationContext::new(3);
        let ast = parse_formula("42").unwrap();
        assert_eq!(
            evaluate(&ast, &ctx).unwrap(),
            numbers(&[Some(42.0), Some(42.0), Some(42.0)])
        );

        let ast = parse_formula("'x'").unwrap();
        assert_eq!(
            evaluate(&ast, &ctx).unwrap(),
            strings(&[Some("x"), Some("x"), Some("x")])
        );
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1 + 2").unwrap(), numbers(&[Some(3.0)]));
        assert_eq!(eval("10 - 3").unwrap(), numbers(&[Some(7.0)]));
        assert_eq!(eval("4 * 5").unwrap(), numbers(&[Some(20.0)]));
        assert_eq!(eval("20 / 8").unwrap(), numbers(&[Some(2.5)]));
        assert_eq!(eval("2 ** 10").unwrap(), numbers(&[Some(1024.0)]));
        assert_eq!(eval("2 ** 3 ** 2").unwrap(), numbers(&[Some(512.0)]));
        assert_eq!(eval("-2 ** 2").unwrap(), numbers(&[Some(-4.0)]));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), numbers(&[Some(9.0)]));
    }

    #[test]
    fn test_floor_division_and_modulo_follow_divisor_sign() {
        assert_eq!(eval("7 // 2").unwrap(), numbers(&[Some(3.0)]));
        assert_eq!(eval("-7 // 2").unwrap(), numbers(&[Some(-4.0)]));
        assert_eq!(eval("7 % 3").unwrap(), numbers(&[Some(1.0)]));
        assert_eq!(eval("-7 % 3").unwrap(), numbers(&[Some(2.0)]));
        assert_eq!(eval("7 % -3").unwrap(), numbers(&[Some(-2.0)]));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1 / 0").unwrap(), numbers(&[Some(f64::INFINITY)]));
        assert_eq!(eval("-1 / 0").unwrap(), numbers(&[Some(f64::NEG_INFINITY)]));
        // 0/0 is NaN, stored as null
        assert_eq!(eval("0 / 0").unwrap(), numbers(&[None]));
    }

    #[test]
    fn test_column_reference() {
        let lab1 = numbers(&[Some(10.0), None, Some(4.0)]);
        assert_eq!(
            eval_with("lab1 * 2", &[("lab1", &lab1)]).unwrap(),
            numbers(&[Some(20.0), None, Some(8.0)])
        );
    }

    #[test]
    fn test_undefined_reference() {
        assert_eq!(
            eval("z * 2"),
            Err(FormulaError::UndefinedReference("z".into()))
        );
    }

    #[test]
    fn test_comparison_yields_numbers() {
        let total = numbers(&[Some(12.0), Some(8.0), None]);
        assert_eq!(
            eval_with("total >= 10", &[("total", &total)]).unwrap(),
            numbers(&[Some(1.0), Some(0.0), None])
        );
        assert_eq!(eval("1 == 1").unwrap(), numbers(&[Some(1.0)]));
        assert_eq!(eval("1 != 1").unwrap(), numbers(&[Some(0.0)]));
        assert_eq!(eval("'abc' < 'abd'").unwrap(), numbers(&[Some(1.0)]));
    }

    #[test]
    fn test_string_concatenation() {
        let first = strings(&[Some("Ada"), None]);
        let last = strings(&[Some("Lovelace"), Some("Hopper")]);
        assert_eq!(
            eval_with("first + ' ' + last", &[("first", &first), ("last", &last)]).unwrap(),
            strings(&[Some("Ada Lovelace"), None])
        );
    }

    #[test]
    fn test_mixed_operands_are_rejected() {
        let name = strings(&[Some("Ada")]);
        assert!(matches!(
            eval_with("name + 1", &[("name", &name)]),
            Err(FormulaError::InvalidOperand(_))
        ));
        assert!(matches!(
            eval_with("name * 2", &[("name", &name)]),
            Err(FormulaError::InvalidOperand(_))
        ));
        assert!(matches!(
            eval_with("-name", &[("name", &name)]),
            Err(FormulaError::InvalidOperand(_))
        ));
        assert!(matches!(
            eval_with("name == 1", &[("name", &name)]),
            Err(FormulaError::InvalidOperand(_))
        ));
    }

    #[test]
    fn test_functions() {
        let math = numbers(&[Some(-20.0), Some(15.0)]);
        assert_eq!(
            eval_with("abs(math)", &[("math", &math)]).unwrap(),
            numbers(&[Some(20.0), Some(15.0)])
        );
        assert_eq!(
            eval_with("max(math, 0)", &[("math", &math)]).unwrap(),
            numbers(&[Some(0.0), Some(15.0)])
        );
        assert_eq!(eval("round(2.567, 2)").unwrap(), numbers(&[Some(2.57)]));
    }

    #[test]
    fn test_function_errors() {
        assert_eq!(
            eval("sqrt(4)"),
            Err(FormulaError::UnknownFunction("sqrt".into()))
        );
        assert!(matches!(
            eval("abs(1, 2)"),
            Err(FormulaError::ArgumentCount { actual: 2, .. })
        ));
        assert!(matches!(
            eval("min()"),
            Err(FormulaError::ArgumentCount { actual: 0, .. })
        ));
    }

    #[test]
    fn test_round_result_compares_like_a_number() {
        let x = numbers(&[Some(5.0), None]);
        assert_eq!(
            eval_with("round(x, -400)", &[("x", &x)]).unwrap(),
            numbers(&[Some(0.0), None])
        );
        assert_eq!(
            eval_with("round(x, -400) == round(x, -400)", &[("x", &x)]).unwrap(),
            numbers(&[Some(1.0), None])
        );
        assert_eq!(
            eval_with("round(x, -400) != round(x, -400)", &[("x", &x)]).unwrap(),
            numbers(&[Some(0.0), None])
        );
    }

    #[test]
    fn test_tallest_accepted_tree_evaluates() {
        let x = numbers(&[Some(1.0)]);
        let formula = vec!["x"; 150].join(" + ");
        assert_eq!(
            eval_with(&formula, &[("x", &x)]).unwrap(),
            numbers(&[Some(150.0)])
        );
    }
}
