//! Row index

use ahash::AHashMap;

/// The ordered set of row keys shared by every column of a table
///
/// Keys keep their insertion order; positions are stable because rows are
/// never removed.
#[derive(Debug, Clone, Default)]
pub struct RowIndex {
    /// Keys in insertion order
    keys: Vec<String>,
    /// Key → position in `keys`
    positions: AHashMap<String, usize>,
}

impl RowIndex {
    /// Create an empty row index
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the index has no rows
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Iterate over the keys in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Position of a key, if present
    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Check if a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Append a key that is not yet present and return its position
    pub(crate) fn push(&mut self, key: String) -> usize {
        debug_assert!(!self.contains(&key));
        let position = self.keys.len();
        self.positions.insert(key.clone(), position);
        self.keys.push(key);
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut index = RowIndex::new();
        assert_eq!(index.push("b".into()), 0);
        assert_eq!(index.push("a".into()), 1);

        assert_eq!(index.keys(), &["b".to_string(), "a".to_string()]);
        assert_eq!(index.position("a"), Some(1));
        assert_eq!(index.position("c"), None);
        assert!(index.contains("b"));
        assert_eq!(index.len(), 2);
    }
}
