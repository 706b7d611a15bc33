use crate::alert::rule::AlertRule;
use crate::source::timestamp::FieldOrder;
use crate::store::filter::Predicate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Columns of the SDK event export, in file order.
pub const DEFAULT_FIELDS: &[&str] = &[
    "error_code",
    "error_message",
    "severity",
    "log_location",
    "mode",
    "model",
    "graphics",
    "session_id",
    "sdkv",
    "test_mode",
    "flow_id",
    "flow_type",
    "sdk_date",
    "publisher_id",
    "game_id",
    "bundle_id",
    "appv",
    "language",
    "os",
    "adv_id",
    "gdpr",
    "ccpa",
    "country_code",
    "date",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub timestamp: TimestampConfig,
    #[serde(default)]
    pub prefilter: Vec<Predicate>,
    #[serde(default)]
    pub rules: Vec<AlertRule>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: PathBuf,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
}

fn default_has_header() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default = "default_date_fields")]
    pub date_fields: Vec<String>,
}

fn default_fields() -> Vec<String> {
    DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_date_fields() -> Vec<String> {
    vec!["sdk_date".to_string()]
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            date_fields: default_date_fields(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimestampConfig {
    #[serde(default)]
    pub field_order: FieldOrder,
    #[serde(default)]
    pub on_parse_error: ParseErrorStrategy,
    #[serde(default)]
    pub on_ambiguous: AmbiguityPolicy,
}

/// What to do with a record whose date field cannot be normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorStrategy {
    /// Skip the record and log a warning. Its id is retired.
    #[default]
    Drop,
    /// Fail the whole load.
    Abort,
}

/// What to do with a date whose day and month could be read either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    #[default]
    Accept,
    Warn,
    Drop,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default)]
    pub sink: SinkKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Log,
    Stdout,
}

// Filter values are compared as text. YAML would turn `1.10` into 1.1 and
// `0x1F` into 31 before we ever see them, so anything but a string is refused.
pub(crate) mod scalar {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_yaml::Value;

    fn into_text<E: Error>(value: Value) -> Result<String, E> {
        let found = match value {
            Value::String(s) => return Ok(s),
            Value::Number(_) => "a number",
            Value::Bool(_) => "a boolean",
            Value::Null => "null",
            Value::Sequence(_) => "a list",
            Value::Mapping(_) => "a mapping",
            Value::Tagged(_) => "a tagged value",
        };
        Err(E::custom(format!(
            "filter value must be a quoted string, found {} (write e.g. value: \"1.10\")",
            found
        )))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        into_text(Value::deserialize(deserializer)?)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Value>::deserialize(deserializer)?
            .map(into_text)
            .transpose()
    }
}
