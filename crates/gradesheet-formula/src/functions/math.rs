//! Math functions

use crate::error::{FormulaError, FormulaResult};
use gradesheet_core::ColumnData;

/// Borrow a numeric argument, rejecting string columns
fn numbers<'a>(function: &str, arg: &'a ColumnData) -> FormulaResult<&'a [Option<f64>]> {
    match arg {
        ColumnData::Number(values) => Ok(values),
        ColumnData::String(_) => Err(FormulaError::InvalidOperand(format!(
            "{}() expects numbers, got strings",
            function
        ))),
    }
}

/// The first argument; the registry checks counts, this keeps direct calls safe
fn first<'a>(function: &str, args: &'a [ColumnData]) -> FormulaResult<&'a ColumnData> {
    args.first().ok_or_else(|| FormulaError::ArgumentCount {
        function: function.to_string(),
        expected: "at least 1".to_string(),
        actual: 0,
    })
}

/// Apply a unary numeric function to every non-null value
fn map_numbers(
    function: &str,
    args: &[ColumnData],
    f: impl Fn(f64) -> f64,
) -> FormulaResult<ColumnData> {
    let values = numbers(function, first(function, args)?)?;
    Ok(ColumnData::Number(
        values.iter().map(|value| value.map(&f)).collect(),
    ))
}

/// Fold the arguments row by row; a null anywhere in a row gives null
fn fold_rows(
    function: &str,
    args: &[ColumnData],
    f: impl Fn(f64, f64) -> f64,
) -> FormulaResult<ColumnData> {
    first(function, args)?;
    let columns = args
        .iter()
        .map(|arg| numbers(function, arg))
        .collect::<FormulaResult<Vec<_>>>()?;

    let len = columns.first().map_or(0, |column| column.len());
    let result = (0..len)
        .map(|row| {
            columns.iter().try_fold(None, |acc: Option<f64>, column| {
                let value = column.get(row).copied().flatten()?;
                Some(Some(acc.map_or(value, |acc| f(acc, value))))
            })
            .flatten()
        })
        .collect();

    Ok(ColumnData::Number(result))
}

/// abs(x)
pub(crate) fn fn_abs(args: &[ColumnData]) -> FormulaResult<ColumnData> {
    map_numbers("abs", args, f64::abs)
}

/// floor(x)
pub(crate) fn fn_floor(args: &[ColumnData]) -> FormulaResult<ColumnData> {
    map_numbers("floor", args, f64::floor)
}

/// ceil(x)
pub(crate) fn fn_ceil(args: &[ColumnData]) -> FormulaResult<ColumnData> {
    map_numbers("ceil", args, f64::ceil)
}

/// round(x, [digits])
///
/// Halves round to the nearest even digit: `round(2.5)` is 2, `round(3.5)` is 4.
/// `digits` may be negative; fractional digits are truncated.
pub(crate) fn fn_round(args: &[ColumnData]) -> FormulaResult<ColumnData> {
    let values = numbers("round", first("round", args)?)?;

    let digits = match args.get(1) {
        Some(arg) => numbers("round", arg)?.to_vec(),
        None => vec![Some(0.0); values.len()],
    };

    let result = values
        .iter()
        .zip(digits)
        .map(|(value, digits)| match (value, digits) {
            (Some(value), Some(digits)) => {
                Some(round_half_even(*value, digits.trunc() as i32)).filter(|v| !v.is_nan())
            }
            _ => None,
        })
        .collect();

    Ok(ColumnData::Number(result))
}

fn round_half_even(value: f64, digits: i32) -> f64 {
    if digits == 0 {
        return value.round_ties_even();
    }
    let factor = 10f64.powi(digits.abs());
    if digits < 0 && factor.is_infinite() {
        // Rounds to a zero that keeps the sign of `value`
        return 0.0f64.copysign(value);
    }
    let scaled = if digits > 0 {
        value * factor
    } else {
        value / factor
    };
    if !scaled.is_finite() {
        return value;
    }
    if digits > 0 {
        scaled.round_ties_even() / factor
    } else {
        scaled.round_ties_even() * factor
    }
}

/// min(x, y, ...) row by row
pub(crate) fn fn_min(args: &[ColumnData]) -> FormulaResult<ColumnData> {
    fold_rows("min", args, f64::min)
}

/// max(x, y, ...) row by row
pub(crate) fn fn_max(args: &[ColumnData]) -> FormulaResult<ColumnData> {
    fold_rows("max", args, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[Option<f64>]) -> ColumnData {
        ColumnData::Number(values.to_vec())
    }

    #[test]
    fn test_abs() {
        let result = fn_abs(&[column(&[Some(-20.0), Some(15.0), None])]).unwrap();
        assert_eq!(result, column(&[Some(20.0), Some(15.0), None]));
    }

    #[test]
    fn test_floor_ceil() {
        let input = column(&[Some(1.5), Some(-1.5)]);
        assert_eq!(
            fn_floor(&[input.clone()]).unwrap(),
            column(&[Some(1.0), Some(-2.0)])
        );
        assert_eq!(fn_ceil(&[input]).unwrap(), column(&[Some(2.0), Some(-1.0)]));
    }

    #[test]
    fn test_round_half_even() {
        let input = column(&[Some(2.5), Some(3.5), Some(-0.5), Some(2.675)]);
        assert_eq!(
            fn_round(&[input]).unwrap(),
            column(&[Some(2.0), Some(4.0), Some(-0.0), Some(3.0)])
        );
    }

    #[test]
    fn test_round_digits() {
        let input = column(&[Some(12.345), Some(1250.0), Some(7.0)]);
        let digits = column(&[Some(1.0), Some(-2.0), None]);
        assert_eq!(
            fn_round(&[input, digits]).unwrap(),
            column(&[Some(12.3), Some(1200.0), None])
        );
    }

    #[test]
    fn test_round_far_left_of_the_point() {
        let input = column(&[Some(5.0), Some(-5.0), Some(1e300)]);
        let digits = column(&[Some(-400.0), Some(-400.0), Some(-400.0)]);
        let result = fn_round(&[input, digits]).unwrap();
        assert_eq!(result, column(&[Some(0.0), Some(-0.0), Some(0.0)]));
        if let ColumnData::Number(values) = result {
            assert!(values[1].unwrap().is_sign_negative());
        }
    }

    #[test]
    fn test_round_never_yields_nan() {
        let input = column(&[Some(f64::INFINITY), Some(1.5)]);
        let digits = column(&[Some(-2.0), Some(400.0)]);
        let result = fn_round(&[input, digits]).unwrap();
        if let ColumnData::Number(values) = &result {
            assert!(values.iter().flatten().all(|v| !v.is_nan()));
        }
        assert_eq!(result, column(&[Some(f64::INFINITY), Some(1.5)]));
    }

    #[test]
    fn test_missing_argument_is_an_error() {
        for function in [fn_abs, fn_floor, fn_ceil, fn_round, fn_min, fn_max] {
            assert!(matches!(
                function(&[]),
                Err(FormulaError::ArgumentCount { actual: 0, .. })
            ));
        }
    }

    #[test]
    fn test_min_max_elementwise() {
        let a = column(&[Some(1.0), Some(8.0), None]);
        let b = column(&[Some(5.0), Some(2.0), Some(3.0)]);
        assert_eq!(
            fn_min(&[a.clone(), b.clone()]).unwrap(),
            column(&[Some(1.0), Some(2.0), None])
        );
        assert_eq!(
            fn_max(&[a, b]).unwrap(),
            column(&[Some(5.0), Some(8.0), None])
        );
    }

    #[test]
    fn test_string_argument_is_rejected() {
        let names = ColumnData::String(vec![Some("a".into())]);
        assert!(matches!(
            fn_abs(&[names.clone()]),
            Err(FormulaError::InvalidOperand(_))
        ));
        assert!(matches!(
            fn_max(&[column(&[Some(1.0)]), names]),
            Err(FormulaError::InvalidOperand(_))
        ));
    }
}
