//! Dynamic row and value model shared across engine adapters.

use std::cmp::Ordering;
use std::fmt;

/// A dynamic cell value.
///
/// This is the unit of data exchanged across the engine boundary. Rendering
/// is deterministic: the same value always produces the same text, which the
/// audit layer and cache keys rely on.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
}

impl Value {
    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the name of the value's type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Deterministic text form used by audit rendering and cache keys.
    ///
    /// `Null` renders as the empty string; everything else renders as its
    /// natural text form, with no quoting.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    /// Formats the value as a literal in the engine query dialect.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => format!("'{}'", value.replace('\'', "''")),
        }
    }

    /// Returns `true` when the value counts as "no key assigned yet".
    ///
    /// Generated-key assignment treats `Null` and `Int(0)` as unset.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Null | Self::Int(0))
    }

    /// Total, deterministic ordering across all value types.
    ///
    /// Nulls sort first, then booleans, then numbers (integers and floats
    /// compared numerically), then text. Used for `ORDER BY` so result
    /// ordering never depends on hash state.
    #[must_use]
    pub fn cmp_total(&self, other: &Self) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::Text(_) => 3,
            }
        }

        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Int(a), Self::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Self::Float(a), Self::Int(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "(null)"),
            other => write!(f, "{}", other.render()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An ordered list of `(column, value)` pairs.
///
/// Column order is the entity's field declaration order and is preserved by
/// every operation; the audit diff contract depends on it. Columns are
/// unique: `set` replaces an existing column in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append, for constructing rows in declaration order.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.set(&column.into(), value);
        self
    }

    /// Sets a column value, replacing in place if the column already exists.
    pub fn set(&mut self, column: &str, value: Value) {
        if let Some(slot) = self
            .columns
            .iter_mut()
            .find(|(name, _)| name.as_str() == column)
        {
            slot.1 = value;
        } else {
            self.columns.push((column.to_string(), value));
        }
    }

    /// Returns the value of a column, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.as_str() == column)
            .map(|(_, value)| value)
    }

    /// Returns `true` if the row has the given column.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Returns the text of a column, if present and textual.
    #[must_use]
    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns the integer value of a column, if present and integral.
    #[must_use]
    pub fn int(&self, column: &str) -> Option<i64> {
        match self.get(column) {
            Some(Value::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean value of a column, if present and boolean.
    #[must_use]
    pub fn boolean(&self, column: &str) -> Option<bool> {
        match self.get(column) {
            Some(Value::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates columns in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Copies every column of `other` into this row, replacing in place.
    ///
    /// Columns only present in `self` are kept, so a partial update row
    /// leaves unrelated columns untouched.
    pub fn merge(&mut self, other: &Row) {
        for (column, value) in other.iter() {
            self.set(column, value.clone());
        }
    }
}

/// The natural key of a row: one or more `(column, value)` pairs.
///
/// Two entities are equal iff their keys are equal, independent of other
/// field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    parts: Vec<(String, Value)>,
}

impl Key {
    /// Creates a single-column key.
    pub fn single(column: impl Into<String>, value: Value) -> Self {
        Self {
            parts: vec![(column.into(), value)],
        }
    }

    /// Creates a composite key from `(column, value)` pairs.
    ///
    /// Part order is significant and must match the entity descriptor's
    /// key column order.
    #[must_use]
    pub fn composite(parts: Vec<(String, Value)>) -> Self {
        Self { parts }
    }

    /// Returns the key parts in declaration order.
    #[must_use]
    pub fn parts(&self) -> &[(String, Value)] {
        &self.parts
    }

    /// Returns `true` when every key column matches the row's value.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.parts
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }

    /// Returns `true` when any key part is still unset (see [`Value::is_unset`]).
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.parts.iter().any(|(_, value)| value.is_unset())
    }

    /// Deterministic text form, used for cache keys and changelog records.
    #[must_use]
    pub fn render(&self) -> String {
        self.parts
            .iter()
            .map(|(column, value)| format!("{column}={}", value.render()))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Key column names, joined with `;` for single-string contexts.
    #[must_use]
    pub fn column_names(&self) -> String {
        self.parts
            .iter()
            .map(|(column, _)| column.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_deterministic() {
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::Bool(true).render(), "true");
        assert_eq!(Value::Int(-7).render(), "-7");
        assert_eq!(Value::text("abc").render(), "abc");
    }

    #[test]
    fn literal_quotes_text() {
        assert_eq!(Value::text("it's").to_literal(), "'it''s'");
        assert_eq!(Value::Null.to_literal(), "NULL");
        assert_eq!(Value::Bool(false).to_literal(), "FALSE");
    }

    #[test]
    fn unset_detection() {
        assert!(Value::Null.is_unset());
        assert!(Value::Int(0).is_unset());
        assert!(!Value::Int(1).is_unset());
        assert!(!Value::text("").is_unset());
    }

    #[test]
    fn total_ordering_across_types() {
        let mut values = vec![
            Value::text("b"),
            Value::Int(2),
            Value::Null,
            Value::Bool(true),
            Value::Int(1),
        ];
        values.sort_by(|a, b| a.cmp_total(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(1),
                Value::Int(2),
                Value::text("b"),
            ]
        );
    }

    #[test]
    fn numeric_cross_type_ordering() {
        assert_eq!(Value::Int(1).cmp_total(&Value::Float(1.5)), Ordering::Less);
        assert_eq!(
            Value::Float(2.5).cmp_total(&Value::Int(2)),
            Ordering::Greater
        );
    }

    #[test]
    fn row_preserves_declaration_order() {
        let row = Row::new()
            .with("ACC_ID", Value::Int(1))
            .with("ACC_NAME", Value::text("a"));
        let columns: Vec<_> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(columns, vec!["ACC_ID", "ACC_NAME"]);
    }

    #[test]
    fn row_set_replaces_in_place() {
        let mut row = Row::new()
            .with("ACC_ID", Value::Int(1))
            .with("ACC_NAME", Value::text("a"));
        row.set("ACC_ID", Value::Int(2));
        assert_eq!(row.int("ACC_ID"), Some(2));
        assert_eq!(row.len(), 2);
        let columns: Vec<_> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(columns, vec!["ACC_ID", "ACC_NAME"]);
    }

    #[test]
    fn row_merge_keeps_unrelated_columns() {
        let mut base = Row::new()
            .with("ACC_ID", Value::Int(1))
            .with("ACC_NAME", Value::text("a"));
        let patch = Row::new().with("ACC_NAME", Value::text("b"));
        base.merge(&patch);
        assert_eq!(base.int("ACC_ID"), Some(1));
        assert_eq!(base.text("ACC_NAME"), Some("b"));
    }

    #[test]
    fn key_matches_row() {
        let row = Row::new()
            .with("GRA_USER", Value::text("anna"))
            .with("GRA_ROLE", Value::text("admin"))
            .with("GRA_COMMENT", Value::text("x"));
        let key = Key::composite(vec![
            ("GRA_USER".into(), Value::text("anna")),
            ("GRA_ROLE".into(), Value::text("admin")),
        ]);
        assert!(key.matches(&row));

        let other = Key::composite(vec![
            ("GRA_USER".into(), Value::text("anna")),
            ("GRA_ROLE".into(), Value::text("guest")),
        ]);
        assert!(!other.matches(&row));
    }

    #[test]
    fn key_render() {
        let key = Key::composite(vec![
            ("GRA_USER".into(), Value::text("anna")),
            ("GRA_ROLE".into(), Value::text("admin")),
        ]);
        assert_eq!(key.render(), "GRA_USER=anna;GRA_ROLE=admin");
        assert_eq!(key.column_names(), "GRA_USER;GRA_ROLE");
    }
}
