//! Rows of normalized text values.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// One fetched record: column names paired with rendered text, in query
/// column order.
///
/// Column names are shared between all rows of a stream. A query may
/// repeat a name (`SELECT 1 AS a, 2 AS a`); positional access keeps every
/// column, while lookup by name and the serialized map see only the last
/// column of that name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// Pairs `values` with `columns`.
    ///
    /// Returns `None` when the lengths differ.
    pub fn new(columns: Arc<[String]>, values: Vec<String>) -> Option<Self> {
        (columns.len() == values.len()).then_some(Self { columns, values })
    }

    /// Value of the last column named `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .rposition(|name| name == column)
            .map(|index| self.values[index].as_str())
    }

    /// Column names in query order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in query order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// `(column, value)` pairs in query order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// `(column, value)` pairs in query order, skipping any column whose name
    /// appears again further right.
    pub fn distinct(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .enumerate()
            .filter(|(index, (column, _))| {
                !self.columns[index + 1..].iter().any(|later| later == column)
            })
            .map(|(_, pair)| pair)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the row, keeping only the values.
    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (column, value) in self.distinct() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn test_row_lookup_and_order() {
        let row = Row::new(
            columns(&["id", "name", "active"]),
            vec!["1".to_string(), "alice".to_string(), "true".to_string()],
        )
        .unwrap();

        assert_eq!(row.get("name"), Some("alice"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 3);

        let pairs: Vec<_> = row.iter().collect();
        assert_eq!(
            pairs,
            [("id", "1"), ("name", "alice"), ("active", "true")]
        );
    }

    #[test]
    fn test_row_length_mismatch() {
        assert!(Row::new(columns(&["id"]), Vec::new()).is_none());
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let row = Row::new(
            columns(&["zeta", "alpha"]),
            vec!["z".to_string(), "null".to_string()],
        )
        .unwrap();

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"zeta":"z","alpha":"null"}"#);
    }

    #[test]
    fn test_row_duplicate_columns_last_wins() {
        let row = Row::new(
            columns(&["a", "b", "a"]),
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        )
        .unwrap();

        assert_eq!(row.get("a"), Some("3"));
        assert_eq!(row.len(), 3);
        assert_eq!(row.values(), ["1", "2", "3"]);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"b":"2","a":"3"}"#);
    }
}
