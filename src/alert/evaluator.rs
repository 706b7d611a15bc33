use super::rule::AlertRule;
use crate::store::bucket::{bucketize, BucketKey, Buckets, Granularity, InvalidGranularity};
use crate::store::filter::Predicate;
use crate::store::record::{FieldError, RecordBatch};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    /// The filter value never occurs in the field.
    #[error("field '{field}' doesn't have value '{value}'")]
    UnknownFilterValue { field: String, value: String },

    /// Only one of filter field and value was given. Handled exactly like
    /// [`AlertError::UnknownFilterValue`], split out to name the missing half.
    #[error("filter field and value must be specified together (field: {field:?}, value: {value:?})")]
    IncompleteFilter {
        field: Option<String>,
        value: Option<String>,
    },

    #[error(transparent)]
    InvalidGranularity(#[from] InvalidGranularity),

    #[error("threshold must be at least 1")]
    InvalidThreshold,

    #[error(transparent)]
    Field(#[from] FieldError),
}

impl AlertError {
    /// Filter problems leave the rule with an empty scope instead of skipping it.
    pub fn empties_scope(&self) -> bool {
        matches!(
            self,
            AlertError::UnknownFilterValue { .. } | AlertError::IncompleteFilter { .. }
        )
    }
}

/// Buckets of one rule that reached its threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertResult {
    pub granularity: Granularity,
    pub threshold: usize,
    pub buckets: Buckets,
    /// Set when the rule's filter could not be applied and nothing was counted
    pub scope_error: Option<AlertError>,
}

impl AlertResult {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, &Vec<usize>)> {
        self.buckets.iter()
    }
}

/// Evaluate `rule` against `batch`.
///
/// A rule without a filter counts the whole batch. With a filter, only
/// records whose filter field compares to the filter value count; a value
/// never observed in the batch, or a filter missing its field or value, is
/// logged and evaluated over an empty scope. An unknown granularity, a zero
/// threshold or an unknown field fails the rule.
pub fn evaluate(batch: &RecordBatch, rule: &AlertRule) -> Result<AlertResult, AlertError> {
    let granularity = rule.granularity()?;
    if rule.threshold == 0 {
        return Err(AlertError::InvalidThreshold);
    }

    let (scope, scope_error) = match select_scope(batch, rule) {
        Ok(scope) => (scope, None),
        Err(e) if e.empties_scope() => {
            error!(
                rule = %rule.label(),
                error = %e,
                "Filter cannot be applied, evaluating empty scope"
            );
            (empty_like(batch), Some(e))
        }
        Err(e) => return Err(e),
    };

    let mut buckets = bucketize(&scope, &rule.date_field, granularity)?;
    buckets.retain(|_, ids| ids.len() >= rule.threshold);

    debug!(
        rule = %rule.label(),
        scope = scope.len(),
        qualifying = buckets.len(),
        "Evaluated rule"
    );

    Ok(AlertResult {
        granularity,
        threshold: rule.threshold,
        buckets,
        scope_error,
    })
}

fn select_scope(batch: &RecordBatch, rule: &AlertRule) -> Result<RecordBatch, AlertError> {
    let Some(filter) = &rule.filter else {
        return Ok(batch.clone());
    };

    match (&filter.field, &filter.value) {
        (None, None) => Ok(batch.clone()),
        (Some(field), Some(value)) => {
            if !batch.observed_values(field)?.contains(value.as_str()) {
                return Err(AlertError::UnknownFilterValue {
                    field: field.clone(),
                    value: value.clone(),
                });
            }
            Ok(batch.filter(&Predicate::new(field, value, filter.mode))?)
        }
        (field, value) => Err(AlertError::IncompleteFilter {
            field: field.clone(),
            value: value.clone(),
        }),
    }
}

fn empty_like(batch: &RecordBatch) -> RecordBatch {
    RecordBatch::from_parts(batch.shared_schema(), Vec::new())
}
