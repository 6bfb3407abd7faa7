//! Behaviour of the document as seen through its public API

use gradesheet::prelude::*;
use gradesheet_core::Error as CoreError;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

fn both_strategies() -> [CalculationOptions; 2] {
    [
        CalculationOptions::with_strategy(ResolutionStrategy::Graph),
        CalculationOptions::with_strategy(ResolutionStrategy::RetryQueue),
    ]
}

fn row_map(entries: &[(&str, CellValue)]) -> IndexMap<String, CellValue> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn test_dependency_declared_after_dependent() {
    let mut doc = Document::new();
    doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
    doc.add_computed_column("quad", "twice * 2").unwrap();
    doc.add_computed_column("twice", "lab1 * 2").unwrap();

    for options in both_strategies() {
        let derived = doc.evaluate_with(&options).unwrap();
        assert_eq!(derived.get("lur", "twice").unwrap(), CellValue::Number(20.0));
        assert_eq!(derived.get("lur", "quad").unwrap(), CellValue::Number(40.0));
    }

    assert_eq!(
        doc.column("twice").unwrap(),
        row_map(&[("lur", CellValue::Number(20.0))])
    );
    assert_eq!(
        doc.column("quad").unwrap(),
        row_map(&[("lur", CellValue::Number(40.0))])
    );
}

#[test]
fn test_abs_total_example() {
    let mut doc = Document::new();
    doc.set("11111", "math", -20).unwrap();
    doc.set("22222", "math", 15).unwrap();
    doc.add_computed_column("prout", "total * 2").unwrap();
    doc.add_computed_column("total", "abs(math)").unwrap();
    doc.set("11111", "name", "Quentin").unwrap();
    doc.set("22222", "info", 12.5).unwrap();

    assert_eq!(
        doc.column("total").unwrap(),
        row_map(&[
            ("11111", CellValue::Number(20.0)),
            ("22222", CellValue::Number(15.0)),
        ])
    );
    assert_eq!(
        doc.column("prout").unwrap(),
        row_map(&[
            ("11111", CellValue::Number(40.0)),
            ("22222", CellValue::Number(30.0)),
        ])
    );
    assert_eq!(
        doc.column_names(),
        vec!["math", "name", "info", "prout", "total"]
    );
    assert_eq!(doc.get("22222", "name").unwrap(), CellValue::Empty);
    assert_eq!(doc.column_type("name").unwrap(), ColumnKind::String);
    assert_eq!(doc.column_type("info").unwrap(), ColumnKind::Number);
}

#[test]
fn test_two_column_cycle() {
    let mut doc = Document::new();
    doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
    doc.add_computed_column("a", "b + 1").unwrap();
    doc.add_computed_column("b", "a + 1").unwrap();

    for options in both_strategies() {
        assert!(matches!(
            doc.evaluate_with(&options),
            Err(Error::Formula(FormulaError::CyclicDependency(_)))
        ));
    }
    assert!(matches!(
        doc.column("lab1"),
        Err(Error::Formula(FormulaError::CyclicDependency(_)))
    ));
}

#[test]
fn test_undefined_reference() {
    let mut doc = Document::new();
    doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
    doc.add_computed_column("c", "z * 2").unwrap();

    for options in both_strategies() {
        match doc.evaluate_with(&options) {
            Err(Error::Formula(FormulaError::UndefinedReference(name))) => assert_eq!(name, "z"),
            other => panic!("expected an undefined reference, got {:?}", other),
        }
    }
}

#[test]
fn test_type_mismatch_leaves_column_unchanged() {
    let mut doc = Document::new();
    doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
    doc.add_source_column("name", [("lur", "Luc")]).unwrap();

    assert!(matches!(
        doc.set("lur", "lab1", "ten"),
        Err(Error::Core(CoreError::TypeMismatch { .. }))
    ));
    assert!(matches!(
        doc.set("lur", "name", 3.0),
        Err(Error::Core(CoreError::TypeMismatch { .. }))
    ));
    // A mismatch on a new row must not create the row either
    assert!(matches!(
        doc.set("lrg", "lab1", "twelve"),
        Err(Error::Core(CoreError::TypeMismatch { .. }))
    ));

    assert_eq!(doc.get("lur", "lab1").unwrap(), CellValue::Number(10.0));
    assert_eq!(doc.get("lur", "name").unwrap(), CellValue::string("Luc"));
    assert_eq!(doc.indexes(), vec!["lur"]);
}

#[test]
fn test_mixed_source_column_is_rejected() {
    let mut doc = Document::new();
    let result = doc.add_source_column(
        "mixed",
        [("lur", CellValue::Number(1.0)), ("lrg", CellValue::string("x"))],
    );
    assert!(matches!(
        result,
        Err(Error::Core(CoreError::TypeMismatch { .. }))
    ));
    assert!(doc.column_names().is_empty());
    assert!(doc.indexes().is_empty());
}

#[test]
fn test_add_row() {
    let mut doc = Document::new();
    doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
    doc.add_row("lrg").unwrap();

    assert_eq!(doc.index("lrg").unwrap()["lab1"], CellValue::Empty);
    assert_eq!(
        doc.index("lur").unwrap(),
        row_map(&[("lab1", CellValue::Number(10.0))])
    );
    assert!(matches!(
        doc.add_row("lur"),
        Err(Error::Core(CoreError::DuplicateRow(_)))
    ));
    assert!(matches!(
        doc.add_row(""),
        Err(Error::Core(CoreError::InvalidKey(_)))
    ));
}

#[test]
fn test_reads_follow_writes() {
    let mut doc = Document::new();
    doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
    doc.add_computed_column("twice", "lab1 * 2").unwrap();
    assert_eq!(doc.get("lur", "twice").unwrap(), CellValue::Number(20.0));

    doc.set("lur", "lab1", 11.0).unwrap();
    assert_eq!(doc.get("lur", "twice").unwrap(), CellValue::Number(22.0));

    doc.set("lrg", "lab1", 15.0).unwrap();
    assert_eq!(doc.get("lrg", "twice").unwrap(), CellValue::Number(30.0));

    doc.set("lur", "lab1", CellValue::Empty).unwrap();
    assert_eq!(doc.get("lur", "twice").unwrap(), CellValue::Empty);
}

#[test]
fn test_failed_evaluation_does_not_mutate() {
    let mut doc = Document::new();
    doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
    doc.add_computed_column("ok", "lab1 + 1").unwrap();
    doc.add_computed_column("bad", "missing").unwrap();

    assert!(doc.evaluate().is_err());
    assert_eq!(doc.column_names(), vec!["lab1", "ok", "bad"]);
    assert_eq!(doc.formula("bad").unwrap(), "missing");

    doc.set_formula("bad", "ok * 2").unwrap();
    assert_eq!(doc.get("lur", "bad").unwrap(), CellValue::Number(22.0));
}
