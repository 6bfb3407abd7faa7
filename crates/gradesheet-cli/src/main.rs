//! Grades CLI - inspect and edit grade sheet documents

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use gradesheet::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grades")]
#[command(author, version, about = "Grade sheet inspection and editing tool")]
struct Cli {
    /// Log evaluation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// How computed columns are ordered before evaluation
    #[arg(long, value_enum, default_value = "graph", global = true)]
    strategy: StrategyArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Graph,
    RetryQueue,
}

impl From<StrategyArg> for ResolutionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Graph => ResolutionStrategy::Graph,
            StrategyArg::RetryQueue => ResolutionStrategy::RetryQueue,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty document
    New {
        /// Document file to create
        file: PathBuf,

        #[arg(long, default_value = "Untitled")]
        title: String,

        #[arg(long, default_value = "")]
        course: String,

        #[arg(long, default_value = "")]
        code: String,
    },

    /// Print the evaluated table
    Show {
        /// Document file
        file: PathBuf,
    },

    /// Check the file against the document schema and evaluate every formula
    Validate {
        /// Document file
        file: PathBuf,

        /// Require the course code as well
        #[arg(long)]
        strict: bool,
    },

    /// Print one column as JSON
    Column {
        file: PathBuf,
        name: String,
    },

    /// Print one row as JSON
    Row {
        file: PathBuf,
        key: String,
    },

    /// Write a cell, creating the row or source column if needed
    Set {
        file: PathBuf,
        row: String,
        column: String,
        value: String,

        /// Store the value as text even if it looks like a number
        #[arg(long)]
        string: bool,
    },

    /// Append an empty row
    AddRow {
        file: PathBuf,
        key: String,
    },

    /// Add an empty source column or a computed column
    AddColumn {
        file: PathBuf,
        name: String,

        /// Formula for a computed column
        #[arg(long, conflicts_with = "kind")]
        formula: Option<String>,

        /// Kind of a new source column (number or string)
        #[arg(long, default_value = "number")]
        kind: ColumnKind,
    },

    /// Replace the formula of a computed column
    SetFormula {
        file: PathBuf,
        name: String,
        formula: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = CalculationOptions::with_strategy(cli.strategy.into());

    match cli.command {
        Commands::New {
            file,
            title,
            course,
            code,
        } => create(&file, title, course, code),
        Commands::Show { file } => show(&file, &options),
        Commands::Validate { file, strict } => validate(&file, strict, &options),
        Commands::Column { file, name } => print_column(&file, &name, &options),
        Commands::Row { file, key } => print_row(&file, &key, &options),
        Commands::Set {
            file,
            row,
            column,
            value,
            string,
        } => edit(&file, |doc| {
            let value = parse_cell(doc, &column, &value, string);
            doc.set(&row, &column, value)
                .with_context(|| format!("Failed to set {}/{}", row, column))
        }),
        Commands::AddRow { file, key } => edit(&file, |doc| {
            doc.add_row(&key)
                .with_context(|| format!("Failed to add row '{}'", key))
        }),
        Commands::AddColumn {
            file,
            name,
            formula,
            kind,
        } => edit(&file, |doc| {
            match formula {
                Some(formula) => doc.add_computed_column(&name, &formula),
                None => doc.add_source_column_with_kind(
                    &name,
                    kind,
                    Vec::<(String, CellValue)>::new(),
                ),
            }
            .with_context(|| format!("Failed to add column '{}'", name))
        }),
        Commands::SetFormula {
            file,
            name,
            formula,
        } => edit(&file, |doc| {
            doc.set_formula(&name, &formula)
                .with_context(|| format!("Failed to set the formula of '{}'", name))
        }),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "gradesheet=debug" } else { "gradesheet=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path) -> Result<Document> {
    Document::from_file(path).with_context(|| format!("Failed to open '{}'", path.display()))
}

/// Load a document, apply a change and save it back
fn edit<F>(path: &Path, change: F) -> Result<()>
where
    F: FnOnce(&mut Document) -> Result<()>,
{
    let mut doc = open(path)?;
    change(&mut doc)?;
    doc.save(None)
        .with_context(|| format!("Failed to save '{}'", path.display()))?;
    debug!(path = %path.display(), "document updated");
    Ok(())
}

fn create(path: &Path, title: String, course: String, code: String) -> Result<()> {
    if path.exists() {
        bail!("'{}' already exists", path.display());
    }
    let mut doc = Document::with_metadata(title, course, code, Local::now().naive_local());
    doc.save(Some(path))
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    eprintln!("Created '{}'", path.display());
    Ok(())
}

fn show(path: &Path, options: &CalculationOptions) -> Result<()> {
    let doc = open(path)?;
    let derived = doc
        .evaluate_with(options)
        .context("Failed to evaluate formulas")?;

    println!("{} - {}", doc.title(), doc.course());
    if !doc.code().is_empty() {
        println!("Code: {}", doc.code());
    }
    println!("Date: {}", doc.date().format("%Y-%m-%d %H:%M"));
    println!();
    println!("{}", derived);
    Ok(())
}

fn validate(path: &Path, strict: bool, options: &CalculationOptions) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("'{}' is not JSON", path.display()))?;

    let schema = if strict {
        DocumentSchema::strict()
    } else {
        DocumentSchema::standard()
    };
    let doc = Document::from_value_with_schema(&value, &schema)
        .with_context(|| format!("'{}' does not match the document schema", path.display()))?;
    let derived = doc
        .evaluate_with(options)
        .context("Failed to evaluate formulas")?;

    println!(
        "OK: {} rows, {} columns ({} computed)",
        derived.row_count(),
        doc.column_names().len(),
        doc.formulas().count()
    );
    Ok(())
}

fn print_column(path: &Path, name: &str, options: &CalculationOptions) -> Result<()> {
    let doc = open(path)?;
    let derived = doc
        .evaluate_with(options)
        .context("Failed to evaluate formulas")?;
    let values = derived
        .column_values(name)
        .with_context(|| format!("Column '{}' not found", name))?;
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

fn print_row(path: &Path, key: &str, options: &CalculationOptions) -> Result<()> {
    let doc = open(path)?;
    let derived = doc
        .evaluate_with(options)
        .context("Failed to evaluate formulas")?;
    let values = derived
        .row_values(key)
        .with_context(|| format!("Row '{}' not found", key))?;
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

/// Interpret a command-line value for the given column
fn parse_cell(doc: &Document, column: &str, raw: &str, force_string: bool) -> CellValue {
    if force_string {
        return CellValue::string(raw);
    }
    if raw.is_empty() {
        return CellValue::Empty;
    }
    let kind = doc.source_table().column(column).map(|c| c.kind());
    match (kind, raw.parse::<f64>()) {
        (Some(ColumnKind::String), _) => CellValue::string(raw),
        (_, Ok(n)) => CellValue::number(n),
        (_, Err(_)) => CellValue::string(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        let mut doc = Document::new();
        doc.add_source_column("lab1", [("lur", 10.0)]).unwrap();
        doc.add_source_column("code", [("lur", "B1")]).unwrap();

        assert_eq!(parse_cell(&doc, "lab1", "12.5", false), CellValue::Number(12.5));
        assert_eq!(parse_cell(&doc, "code", "12", false), CellValue::string("12"));
        assert_eq!(parse_cell(&doc, "fresh", "7", false), CellValue::Number(7.0));
        assert_eq!(parse_cell(&doc, "fresh", "Luc", false), CellValue::string("Luc"));
        assert_eq!(parse_cell(&doc, "lab1", "7", true), CellValue::string("7"));
        assert_eq!(parse_cell(&doc, "lab1", "", false), CellValue::Empty);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
