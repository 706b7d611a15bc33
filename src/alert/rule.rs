use crate::store::bucket::{Granularity, InvalidGranularity};
use crate::store::filter::Comparison;
use serde::{Deserialize, Serialize};

/// One configured threshold check.
///
/// `granularity` is kept as the configured token so an unrecognized value
/// skips only this rule at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_date_field")]
    pub date_field: String,
    pub granularity: String,
    pub threshold: usize,
    #[serde(default)]
    pub filter: Option<RuleFilter>,
}

fn default_date_field() -> String {
    "sdk_date".to_string()
}

/// Restricts a rule to records whose `field` compares to `value`.
///
/// Field and value are both optional here so a half-specified filter in a
/// config file reaches the evaluator and is reported there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFilter {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "crate::config::types::scalar::deserialize_option")]
    pub value: Option<String>,
    #[serde(default)]
    pub mode: Comparison,
}

impl AlertRule {
    pub fn new(date_field: impl Into<String>, granularity: Granularity, threshold: usize) -> Self {
        Self {
            name: None,
            date_field: date_field.into(),
            granularity: granularity.label().to_string(),
            threshold,
            filter: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_filter(
        mut self,
        field: impl Into<String>,
        value: impl Into<String>,
        mode: Comparison,
    ) -> Self {
        self.filter = Some(RuleFilter {
            field: Some(field.into()),
            value: Some(value.into()),
            mode,
        });
        self
    }

    pub fn granularity(&self) -> Result<Granularity, InvalidGranularity> {
        self.granularity.parse()
    }

    /// Name used in logs and reports
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}@{}", self.granularity, self.threshold),
        }
    }
}
