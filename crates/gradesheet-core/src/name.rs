//! Column name and row key validation

use crate::error::{Error, Result};

/// Check whether `name` is an identifier
///
/// An identifier starts with a letter or `_` and continues with letters,
/// digits or `_`. Letters are Unicode alphabetic characters, so `note_été`
/// is accepted.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Validate a column name
pub fn validate_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidName {
            name: name.to_string(),
            reason: "column names must be valid identifiers",
        })
    }
}

/// Validate a row key
pub fn validate_row_key(key: &str) -> Result<()> {
    if key.is_empty() {
        Err(Error::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("lab1"));
        assert!(is_identifier("_total"));
        assert!(is_identifier("note_été"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1lab"));
        assert!(!is_identifier("lab 1"));
        assert!(!is_identifier("lab-1"));
        assert!(!is_identifier("a.b"));
    }

    #[test]
    fn test_validate_identifier_error() {
        let err = validate_identifier("bad name").unwrap_err();
        assert!(matches!(err, Error::InvalidName { ref name, .. } if name == "bad name"));
    }

    #[test]
    fn test_validate_row_key() {
        assert!(validate_row_key("11111").is_ok());
        assert!(validate_row_key("a b").is_ok());
        assert_eq!(validate_row_key(""), Err(Error::InvalidKey(String::new())));
    }
}
