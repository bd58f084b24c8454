//! Field identifiers, typed field values, and the per-row argument set.

use std::fmt;

use serde::Serialize;

/// Name of one input or output variable declared by the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FieldName(String);

impl FieldName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// A typed value coerced from raw input text.
///
/// Produced only by `ModelEvaluator::prepare`; the model's data dictionary
/// owns the type and valid-value domain per field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl FieldValue {
    /// Numeric view for comparisons; integers widen to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Boolean(_) | FieldValue::String(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Boolean(v) => write!(f, "{v}"),
            FieldValue::String(v) => f.write_str(v),
        }
    }
}

/// Insertion-ordered mapping from field name to coerced value.
///
/// Built fresh per input row and consumed by a single evaluation. Holds a
/// handful of entries, so lookups scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSet {
    entries: Vec<(FieldName, FieldValue)>,
}

impl ArgumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing in place if the name is already present.
    pub fn insert(&mut self, name: FieldName, value: FieldValue) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &FieldName) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut args = ArgumentSet::new();
        args.insert(FieldName::from("temperature"), FieldValue::Float(70.0));
        args.insert(FieldName::from("humidity"), FieldValue::Float(90.0));
        args.insert(FieldName::from("windy"), FieldValue::Boolean(true));

        let names: Vec<&str> = args.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["temperature", "humidity", "windy"]);
    }

    #[test]
    fn test_insert_replaces_without_reordering() {
        let mut args = ArgumentSet::new();
        args.insert(FieldName::from("a"), FieldValue::Integer(1));
        args.insert(FieldName::from("b"), FieldValue::Integer(2));
        args.insert(FieldName::from("a"), FieldValue::Integer(3));

        assert_eq!(args.len(), 2);
        assert_eq!(args.get(&FieldName::from("a")), Some(&FieldValue::Integer(3)));
        let names: Vec<&str> = args.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(FieldValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(FieldValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(FieldValue::Boolean(true).as_f64(), None);
        assert_eq!(FieldValue::String("x".into()).as_f64(), None);
    }
}
