use super::evaluator::AlertResult;
use super::rule::{AlertRule, RuleFilter};
use crate::store::bucket::Granularity;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

/// Destination for report lines.
pub trait AlertSink {
    fn emit(&mut self, line: &str);
}

/// Emits each line as an info event.
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn emit(&mut self, line: &str) {
        info!(target: "logtally::alert", "{}", line);
    }
}

#[derive(Debug, Default)]
pub struct StdoutSink;

impl AlertSink for StdoutSink {
    fn emit(&mut self, line: &str) {
        println!("{}", line);
    }
}

impl AlertSink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Summary line followed by one line per qualifying bucket.
pub fn report(rule: &AlertRule, result: &AlertResult) -> Vec<String> {
    let mut lines = Vec::with_capacity(result.len() + 1);
    lines.push(format!(
        "[{}] During {} buckets you have {} alert(s) at threshold {}",
        rule.label(),
        result.granularity,
        result.len(),
        result.threshold
    ));

    for (key, ids) in result.iter() {
        lines.push(format!("\t{}: {} logs", key, ids.len()));
    }

    lines
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    rule: String,
    granularity: Granularity,
    threshold: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a RuleFilter>,
    alerts: usize,
    buckets: Vec<JsonBucket<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonBucket<'a> {
    key: String,
    start: Option<NaiveDateTime>,
    count: usize,
    ids: &'a [usize],
}

/// The whole result as a single JSON line.
pub fn render_json(rule: &AlertRule, result: &AlertResult) -> Result<String, serde_json::Error> {
    let report = JsonReport {
        rule: rule.label(),
        granularity: result.granularity,
        threshold: result.threshold,
        filter: rule.filter.as_ref(),
        alerts: result.len(),
        buckets: result
            .iter()
            .map(|(key, ids)| JsonBucket {
                key: key.to_string(),
                start: key.start(),
                count: ids.len(),
                ids,
            })
            .collect(),
        error: result.scope_error.as_ref().map(|e| e.to_string()),
    };

    serde_json::to_string(&report)
}
