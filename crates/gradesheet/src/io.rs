//! JSON persistence for [`Document`]
//!
//! A document file holds the metadata, then one entry per column in display
//! order: source columns with their `dtype` and rows, computed columns with
//! their formula text.
//!
//! ```json
//! {
//!     "title": "Examen",
//!     "course": "Programmation",
//!     "code": "in2l",
//!     "datetime": "2025-10-23T15:45:12",
//!     "columns": [
//!         {"type": "source", "name": "lab1", "dtype": "number", "rows": {"lur": 10.0}},
//!         {"type": "computed", "name": "twice", "formula": "lab1 * 2"}
//!     ]
//! }
//! ```

use crate::document::Document;
use crate::error::{Error, Result};
use crate::schema::{parse_datetime, validate_document, DocumentSchema, DATETIME_FORMAT};
use gradesheet_core::{CellValue, ColumnKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Options for writing document files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Spaces per indentation level
    pub indent: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

/// On-disk layout of a document
#[derive(Debug, Serialize, Deserialize)]
struct DocumentFile {
    title: String,
    course: String,
    #[serde(default)]
    code: String,
    datetime: String,
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ColumnEntry {
    Source {
        name: String,
        dtype: ColumnKind,
        rows: IndexMap<String, CellValue>,
    },
    Computed {
        name: String,
        formula: String,
    },
}

impl Document {
    /// Build a document from parsed JSON, validated against the standard schema
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::from_value_with_schema(value, &DocumentSchema::standard())
    }

    /// Build a document from parsed JSON, validated against `schema`
    ///
    /// Columns are added in file order. The result is not dirty.
    pub fn from_value_with_schema(value: &Value, schema: &DocumentSchema) -> Result<Self> {
        validate_document(schema, value)?;
        let file = DocumentFile::deserialize(value)?;

        let date = parse_datetime(&file.datetime).ok_or_else(|| {
            Error::schema("/datetime", "expected an ISO-8601 date-time")
        })?;
        let mut doc = Document::with_metadata(file.title, file.course, file.code, date);

        for column in file.columns {
            match column {
                ColumnEntry::Source { name, dtype, rows } => {
                    doc.add_source_column_with_kind(&name, dtype, rows)?;
                }
                ColumnEntry::Computed { name, formula } => {
                    doc.add_computed_column(&name, &formula)?;
                }
            }
        }

        doc.mark_clean();
        Ok(doc)
    }

    /// Parse a document from a JSON string
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(&value)
    }

    /// Load a document file
    ///
    /// The path is remembered for [`save`](Self::save).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;

        let mut doc = Self::from_value(&value)?;
        doc.mark_saved(path.to_path_buf());
        info!(path = %path.display(), columns = doc.column_names().len(), "loaded document");
        Ok(doc)
    }

    fn to_file_layout(&self) -> Result<DocumentFile> {
        let table = self.source_table();
        if table.column_count() == 0 && table.row_count() > 0 {
            return Err(Error::RowsWithoutSourceColumn(table.row_count()));
        }
        let mut columns: Vec<ColumnEntry> = table
            .columns()
            .map(|column| ColumnEntry::Source {
                name: column.name().to_string(),
                dtype: column.kind(),
                rows: table
                    .index()
                    .iter()
                    .enumerate()
                    .map(|(position, key)| (key.to_string(), column.get(position)))
                    .collect(),
            })
            .collect();

        columns.extend(self.formulas().map(|(name, formula)| ColumnEntry::Computed {
            name: name.to_string(),
            formula: formula.to_string(),
        }));

        Ok(DocumentFile {
            title: self.title().to_string(),
            course: self.course().to_string(),
            code: self.code().to_string(),
            datetime: self.date().format(DATETIME_FORMAT).to_string(),
            columns,
        })
    }

    /// The document as JSON
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.to_file_layout()?)?)
    }

    /// The document as pretty-printed JSON, indented with 4 spaces
    pub fn to_json_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_json(&mut buf, &SaveOptions::default())?;
        String::from_utf8(buf).map_err(|e| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    fn write_json<W: Write>(&self, writer: W, options: &SaveOptions) -> Result<()> {
        let indent = vec![b' '; options.indent];
        let formatter = PrettyFormatter::with_indent(&indent);
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        self.to_file_layout()?.serialize(&mut serializer)?;
        Ok(())
    }

    /// Save with default options
    ///
    /// Uses `path`, or else the file the document was loaded from or last
    /// saved to.
    pub fn save(&mut self, path: Option<&Path>) -> Result<()> {
        self.save_with(path, &SaveOptions::default())
    }

    /// Save the document
    ///
    /// The file is written next to the target and renamed over it, so a
    /// failed save leaves an existing file untouched. The saved file keeps the
    /// permissions of the file it replaces. On success the path is
    /// remembered and the document is no longer dirty.
    pub fn save_with(&mut self, path: Option<&Path>, options: &SaveOptions) -> Result<()> {
        let path = match path.or_else(|| self.filename()) {
            Some(path) => path.to_path_buf(),
            None => return Err(Error::MissingFilename),
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };

        // A new file gets the permissions a plain create would give it
        let (permissions, placeholder) = match fs::metadata(&path) {
            Ok(meta) => (meta.permissions(), false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
                (file.metadata()?.permissions(), true)
            }
            Err(e) => return Err(e.into()),
        };

        let written = self.write_replacing(&path, &dir, permissions, options);
        if written.is_err() && placeholder {
            let _ = fs::remove_file(&path);
        }
        written?;

        info!(path = %path.display(), "saved document");
        self.mark_saved(path);
        Ok(())
    }

    fn write_replacing(
        &self,
        path: &Path,
        dir: &Path,
        permissions: Permissions,
        options: &SaveOptions,
    ) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            self.write_json(&mut writer, options)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.as_file().set_permissions(permissions)?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
