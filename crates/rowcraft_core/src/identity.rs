use crate::{NamedRow, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key values that identified a row when it was loaded.
///
/// Captured once per pending change and never re-derived from edited cells.
/// Keeps primary key column order so WHERE predicates read naturally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyValues(IndexMap<String, Value>);

impl PrimaryKeyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the key of `row` for the given primary key columns.
    ///
    /// Returns `None` when the row lacks one of the key columns.
    pub fn from_row(pk_columns: &[String], row: &NamedRow) -> Option<Self> {
        let mut values = IndexMap::with_capacity(pk_columns.len());

        for column in pk_columns {
            values.insert(column.clone(), row.get(column)?.clone());
        }

        Some(Self(values))
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Deterministic key for this identity, independent of column order.
    ///
    /// Columns are sorted by name and joined as `name:value` pairs with `|`.
    /// `\`, `:` and `|` inside names and values are backslash-escaped, so
    /// distinct keys never share a hash. NULL renders as a sentinel that
    /// cannot be produced by a text value.
    pub fn identity_hash(&self) -> IdentityHash {
        let mut pairs: Vec<(&String, &Value)> = self.0.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let joined = pairs
            .into_iter()
            .map(|(column, value)| {
                format!(
                    "{}:{}",
                    escape_identity_part(column),
                    escape_identity_part(&value.identity_text())
                )
            })
            .collect::<Vec<_>>()
            .join("|");

        IdentityHash(joined)
    }
}

impl FromIterator<(String, Value)> for PrimaryKeyValues {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn escape_identity_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for ch in part.chars() {
        if matches!(ch, '\\' | ':' | '|') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Simple-equality surrogate for a row's primary key. Not a cryptographic hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityHash(String);

impl IdentityHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ignores_insertion_order() {
        let ab = PrimaryKeyValues::new().with("a", 1).with("b", 2);
        let ba = PrimaryKeyValues::new().with("b", 2).with("a", 1);

        assert_eq!(ab.identity_hash(), ba.identity_hash());
        assert_eq!(ab.identity_hash().as_str(), "a:1|b:2");
    }

    #[test]
    fn hash_distinguishes_values() {
        let one = PrimaryKeyValues::new().with("id", 1);
        let two = PrimaryKeyValues::new().with("id", 2);
        assert_ne!(one.identity_hash(), two.identity_hash());
    }

    #[test]
    fn null_key_does_not_collide_with_null_text() {
        let null = PrimaryKeyValues::new().with("code", Value::Null);
        let text = PrimaryKeyValues::new().with("code", "null");
        assert_ne!(null.identity_hash(), text.identity_hash());
    }

    #[test]
    fn separators_inside_text_keys_do_not_collide() {
        let first = PrimaryKeyValues::new().with("a", "x|b:y").with("b", "z");
        let second = PrimaryKeyValues::new().with("a", "x").with("b", "y|b:z");

        assert_ne!(first.identity_hash(), second.identity_hash());
        assert_eq!(first.identity_hash().as_str(), "a:x\\|b\\:y|b:z");

        let slash = PrimaryKeyValues::new().with("a", "x\\").with("b", "y");
        let escaped_bar = PrimaryKeyValues::new().with("a", "x\\|b:y");
        assert_ne!(slash.identity_hash(), escaped_bar.identity_hash());
    }

    #[test]
    fn from_row_keeps_key_column_order() {
        let mut row = NamedRow::new();
        row.insert("name".to_string(), Value::text("Bob"));
        row.insert("id".to_string(), Value::Int(5));
        row.insert("tenant".to_string(), Value::Int(2));

        let pk = PrimaryKeyValues::from_row(&["tenant".to_string(), "id".to_string()], &row)
            .expect("key columns present");

        let columns: Vec<&String> = pk.iter().map(|(c, _)| c).collect();
        assert_eq!(columns, vec!["tenant", "id"]);
        assert_eq!(pk.get("id"), Some(&Value::Int(5)));
    }

    #[test]
    fn from_row_requires_every_key_column() {
        let mut row = NamedRow::new();
        row.insert("name".to_string(), Value::text("Bob"));

        assert!(PrimaryKeyValues::from_row(&["id".to_string()], &row).is_none());
    }
}
