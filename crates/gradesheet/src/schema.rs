//! Document schema validation
//!
//! Documents are checked against a [`DocumentSchema`] before any column is
//! built. Errors point at the first offending value with a JSON pointer, e.g.
//! `/columns/1/rows/lur`.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Format used when writing `datetime`
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an ISO-8601 timestamp
///
/// Accepts `YYYY-MM-DDTHH:MM:SS[.ffffff]` (a space may replace the `T`),
/// the same with a UTC offset (the offset is dropped and the local wall time
/// kept), or a bare date meaning midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Static description of what a document file must contain
///
/// `datetime` (ISO-8601 string) and `columns` (array) are always required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSchema {
    /// Top-level string fields that must be present
    pub required_strings: &'static [&'static str],
    /// Top-level string fields that may be missing (read as empty)
    pub optional_strings: &'static [&'static str],
}

impl DocumentSchema {
    /// The schema used by [`Document::from_value`](crate::Document::from_value)
    ///
    /// `code` may be missing.
    pub const fn standard() -> Self {
        Self {
            required_strings: &["title", "course"],
            optional_strings: &["code"],
        }
    }

    /// Like [`standard`](Self::standard), with `code` required
    pub const fn strict() -> Self {
        Self {
            required_strings: &["title", "course", "code"],
            optional_strings: &[],
        }
    }
}

impl Default for DocumentSchema {
    fn default() -> Self {
        Self::standard()
    }
}

/// Check a parsed JSON document against `schema`
pub fn validate_document(schema: &DocumentSchema, value: &Value) -> Result<()> {
    let root = value
        .as_object()
        .ok_or_else(|| Error::schema("", "document must be an object"))?;

    for key in schema.required_strings {
        require(root, "", key)?;
        expect_string(root, "", key)?;
    }
    for key in schema.optional_strings {
        if root.contains_key(*key) {
            expect_string(root, "", key)?;
        }
    }

    require(root, "", "datetime")?;
    let datetime = expect_string(root, "", "datetime")?;
    if parse_datetime(datetime).is_none() {
        return Err(Error::schema(
            "/datetime",
            format!("{:?} is not an ISO-8601 date-time", datetime),
        ));
    }

    require(root, "", "columns")?;
    let columns = root["columns"]
        .as_array()
        .ok_or_else(|| Error::schema("/columns", "expected an array"))?;

    for (i, column) in columns.iter().enumerate() {
        validate_column(&format!("/columns/{}", i), column)?;
    }

    Ok(())
}

fn validate_column(path: &str, column: &Value) -> Result<()> {
    let column = column
        .as_object()
        .ok_or_else(|| Error::schema(path, "column entry must be an object"))?;

    require(column, path, "name")?;
    expect_string(column, path, "name")?;
    require(column, path, "type")?;

    match expect_string(column, path, "type")? {
        "source" => {
            require(column, path, "dtype")?;
            let dtype: fn(&Value) -> bool = match expect_string(column, path, "dtype")? {
                "number" => Value::is_number,
                "string" => Value::is_string,
                other => {
                    return Err(Error::schema(
                        format!("{}/dtype", path),
                        format!("{:?} is not one of \"number\", \"string\"", other),
                    ))
                }
            };

            require(column, path, "rows")?;
            let rows = column["rows"]
                .as_object()
                .ok_or_else(|| Error::schema(format!("{}/rows", path), "expected an object"))?;

            for (key, value) in rows {
                let row_path = format!("{}/rows/{}", path, escape_pointer(key));
                if key.is_empty() {
                    return Err(Error::schema(row_path, "row keys must be non-empty"));
                }
                if !(value.is_null() || dtype(value)) {
                    return Err(Error::schema(
                        row_path,
                        format!("{} does not match dtype {}", value, column["dtype"]),
                    ));
                }
            }
            Ok(())
        }
        "computed" => {
            require(column, path, "formula")?;
            expect_string(column, path, "formula")?;
            Ok(())
        }
        other => Err(Error::schema(
            format!("{}/type", path),
            format!("{:?} is not one of \"source\", \"computed\"", other),
        )),
    }
}

fn require(object: &Map<String, Value>, path: &str, key: &str) -> Result<()> {
    if object.contains_key(key) {
        Ok(())
    } else {
        Err(Error::schema(
            path,
            format!("missing required property `{}`", key),
        ))
    }
}

fn expect_string<'v>(object: &'v Map<String, Value>, path: &str, key: &str) -> Result<&'v str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::schema(format!("{}/{}", path, key), "expected a string"))
}

/// Escape a key for use as a JSON pointer segment (RFC 6901)
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
