//! Filters - Typed storage filters, projections and changesets
//!
//! Field names are always the wire (camelCase) names declared by the entity.
//! Each storage binding translates them to its own representation.

use super::id::RecordId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Closed set of values a field can hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Id(RecordId),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Equality with numeric widening, so `Int(2)` matches `Float(2.0)`.
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Total order used for sorting. Nulls first, numbers compared as floats,
    /// values of unrelated kinds compare equal.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Id(a), Self::Id(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            },
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<RecordId> for FieldValue {
    fn from(value: RecordId) -> Self {
        Self::Id(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One clause of a conjunctive filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Exact match.
    Eq { field: String, value: FieldValue },
    /// Case-insensitive substring match on any of `fields`.
    Search { fields: Vec<String>, term: String },
    /// Inclusive numeric range; a missing bound is unbounded.
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Condition {
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Eq { field, .. } | Self::Range { field, .. } => vec![field.as_str()],
            Self::Search { fields, .. } => fields.iter().map(String::as_str).collect(),
        }
    }

    /// Evaluates the clause against a field lookup.
    pub fn test<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<FieldValue>,
    {
        match self {
            Self::Eq { field, value } => lookup(field)
                .map(|v| v.matches(value))
                .unwrap_or(value.is_null()),
            Self::Search { fields, term } => {
                let needle = term.to_lowercase();
                fields.iter().any(|field| {
                    lookup(field)
                        .and_then(|v| v.as_str().map(|s| s.to_lowercase().contains(&needle)))
                        .unwrap_or(false)
                })
            }
            Self::Range { field, min, max } => match lookup(field).and_then(|v| v.as_f64()) {
                Some(n) => min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi),
                None => false,
            },
        }
    }
}

/// Ordered conjunction of conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn search<I, S>(mut self, fields: I, term: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions.push(Condition::Search {
            fields: fields.into_iter().map(Into::into).collect(),
            term: term.into(),
        });
        self
    }

    pub fn range(mut self, field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        self.conditions.push(Condition::Range {
            field: field.into(),
            min,
            max,
        });
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn test<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<FieldValue>,
    {
        self.conditions.iter().all(|c| c.test(&lookup))
    }
}

/// Fields to hide from returned entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    hidden: Vec<&'static str>,
}

impl Projection {
    pub fn hide(fields: &[&'static str]) -> Self {
        Self {
            hidden: fields.to_vec(),
        }
    }

    pub fn hides(&self, field: &str) -> bool {
        self.hidden.iter().any(|f| *f == field)
    }
}

/// Partial update payload: ordered field assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    assignments: Vec<(&'static str, FieldValue)>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `field`, replacing any earlier assignment of the same field.
    pub fn set(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match self.assignments.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.assignments.push((field, value)),
        }
        self
    }

    /// Assigns `field` only when a value is supplied.
    pub fn set_some<T: Into<FieldValue>>(self, field: &'static str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(field, value),
            None => self,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.assignments
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, FieldValue)> {
        self.assignments.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some("Mechanical Keyboard".into()),
            "sku" => Some("KB-001".into()),
            "price" => Some(FieldValue::Float(89.5)),
            "quantity" => Some(FieldValue::Int(3)),
            "description" => Some(FieldValue::Null),
            _ => None,
        }
    }

    #[test]
    fn search_is_case_insensitive_substring_over_any_field() {
        assert!(Filter::new().search(["name", "sku"], "KEYB").test(lookup));
        assert!(Filter::new().search(["description", "sku"], "kb-0").test(lookup));
        assert!(!Filter::new().search(["description"], "keyb").test(lookup));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(Filter::new().range("price", Some(89.5), Some(89.5)).test(lookup));
        assert!(Filter::new().range("price", None, Some(100.0)).test(lookup));
        assert!(!Filter::new().range("price", Some(90.0), None).test(lookup));
        assert!(!Filter::new().range("name", Some(0.0), None).test(lookup));
    }

    #[test]
    fn conditions_are_conjunctive() {
        let filter = Filter::new().eq("quantity", 3i64).eq("sku", "KB-001");
        assert!(filter.test(lookup));

        let filter = filter.eq("quantity", FieldValue::Float(4.0));
        assert!(!filter.test(lookup));
    }

    #[test]
    fn null_matches_missing_or_null_fields() {
        assert!(Filter::new().eq("description", FieldValue::Null).test(lookup));
        assert!(Filter::new().eq("unknown", FieldValue::Null).test(lookup));
    }

    #[test]
    fn later_assignments_replace_earlier_ones() {
        let changes = Changes::new().set("name", "a").set("quantity", 1i64).set("name", "b");
        assert_eq!(changes.get("name"), Some(&FieldValue::from("b")));
        assert_eq!(changes.iter().count(), 2);
    }

    #[test]
    fn sort_order_puts_nulls_first() {
        let mut values = vec![FieldValue::Int(3), FieldValue::Null, FieldValue::Float(1.5)];
        values.sort_by(|a, b| a.compare(b));
        assert_eq!(
            values,
            vec![FieldValue::Null, FieldValue::Float(1.5), FieldValue::Int(3)]
        );
    }
}
