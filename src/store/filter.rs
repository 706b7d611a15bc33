use super::record::{FieldError, RecordBatch};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// How a record's field value is compared against an expected value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Exact string equality
    #[default]
    Equals,
    GreaterThan,
    GreaterOrEqual,
}

impl Comparison {
    pub fn matches(&self, actual: &str, expected: &str) -> bool {
        match self {
            Comparison::Equals => actual == expected,
            Comparison::GreaterThan => compare_values(actual, expected) == Ordering::Greater,
            Comparison::GreaterOrEqual => compare_values(actual, expected) != Ordering::Less,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Comparison::Equals => "==",
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
        };
        f.write_str(op)
    }
}

/// Numeric when both sides parse as numbers, lexicographic otherwise.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or_else(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

/// A single-field condition on records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    #[serde(deserialize_with = "crate::config::types::scalar::deserialize")]
    pub value: String,
    #[serde(default)]
    pub mode: Comparison,
}

impl Predicate {
    pub fn new(field: impl Into<String>, value: impl Into<String>, mode: Comparison) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            mode,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, value, Comparison::Equals)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.field, self.mode, self.value)
    }
}

impl RecordBatch {
    /// Records satisfying `predicate`, in their original order.
    pub fn filter(&self, predicate: &Predicate) -> Result<RecordBatch, FieldError> {
        let index = self.schema().index_of(&predicate.field)?;
        let records = self
            .shared_records()
            .filter(|r| {
                r.value(index)
                    .is_some_and(|v| predicate.mode.matches(v, &predicate.value))
            })
            .cloned()
            .collect();

        Ok(RecordBatch::from_parts(self.shared_schema(), records))
    }

    /// Records satisfying every predicate.
    pub fn filter_all(&self, predicates: &[Predicate]) -> Result<RecordBatch, FieldError> {
        predicates
            .iter()
            .try_fold(self.clone(), |batch, predicate| batch.filter(predicate))
    }
}
