use crate::alert::{evaluate, render_json, report, AlertError, AlertResult, AlertRule, AlertSink};
use crate::config::types::{Config, ReportFormat};
use crate::source::reader::{read_rows, ReaderError};
use crate::source::timestamp::TimestampNormalizer;
use crate::store::record::{FieldError, LoadError, LoadSummary, RecordBatch, RecordStore, Schema};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input error: {0}")]
    Reader(#[from] ReaderError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("pre-filter error: {0}")]
    Prefilter(#[from] FieldError),

    #[error("rule task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

/// What happened to one configured rule.
#[derive(Debug)]
pub enum RuleOutcome {
    Evaluated { rule: AlertRule, result: AlertResult },
    Skipped { rule: AlertRule, error: AlertError },
}

impl RuleOutcome {
    pub fn rule(&self) -> &AlertRule {
        match self {
            RuleOutcome::Evaluated { rule, .. } | RuleOutcome::Skipped { rule, .. } => rule,
        }
    }

    pub fn result(&self) -> Option<&AlertResult> {
        match self {
            RuleOutcome::Evaluated { result, .. } => Some(result),
            RuleOutcome::Skipped { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub load: LoadSummary,
    /// Records left after the pre-filter
    pub in_scope: usize,
    pub outcomes: Vec<RuleOutcome>,
}

impl RunSummary {
    /// Qualifying buckets across all evaluated rules
    pub fn alerts(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(RuleOutcome::result)
            .map(AlertResult::len)
            .sum()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RuleOutcome::Skipped { .. }))
            .count()
    }
}

/// Read the configured input and load it through a [`RecordStore`].
pub fn load_batch(config: &Config) -> Result<(RecordBatch, LoadSummary), PipelineError> {
    let schema = Schema::new(
        config.schema.fields.clone(),
        config.schema.date_fields.as_slice(),
    )?;
    let store = RecordStore::new(schema, TimestampNormalizer::new(config.timestamp.field_order))
        .with_parse_error_strategy(config.timestamp.on_parse_error)
        .with_ambiguity_policy(config.timestamp.on_ambiguous);

    info!(path = %config.input.path.display(), "Reading input");
    let rows = read_rows(&config.input.path, config.input.has_header)?;

    Ok(store.load(rows)?)
}

/// Evaluate every rule against the shared batch, one blocking task per rule.
/// Outcomes come back in rule order.
pub async fn evaluate_rules(
    batch: Arc<RecordBatch>,
    rules: &[AlertRule],
) -> Result<Vec<RuleOutcome>, PipelineError> {
    let tasks = rules.iter().cloned().map(|rule| {
        let batch = Arc::clone(&batch);
        tokio::task::spawn_blocking(move || match evaluate(&batch, &rule) {
            Ok(result) => RuleOutcome::Evaluated { rule, result },
            Err(error) => RuleOutcome::Skipped { rule, error },
        })
    });

    Ok(futures::future::try_join_all(tasks).await?)
}

/// Send each evaluated rule's report to `sink`; log skipped rules.
pub fn emit_reports(
    outcomes: &[RuleOutcome],
    format: ReportFormat,
    sink: &mut dyn AlertSink,
) -> Result<(), PipelineError> {
    for outcome in outcomes {
        match outcome {
            RuleOutcome::Evaluated { rule, result } => match format {
                ReportFormat::Text => {
                    for line in report(rule, result) {
                        sink.emit(&line);
                    }
                }
                ReportFormat::Json => sink.emit(&render_json(rule, result)?),
            },
            RuleOutcome::Skipped { rule, error } => {
                error!(
                    rule = %rule.label(),
                    granularity = %rule.granularity,
                    error = %error,
                    "Skipping rule"
                );
            }
        }
    }

    Ok(())
}

/// Load, pre-filter, evaluate and report.
pub async fn run_pipeline(
    config: &Config,
    sink: &mut dyn AlertSink,
) -> Result<RunSummary, PipelineError> {
    let (batch, load) = load_batch(config)?;

    let batch = batch.filter_all(&config.prefilter)?;
    for predicate in &config.prefilter {
        info!(predicate = %predicate, "Pre-filter");
    }
    info!(in_scope = batch.len(), loaded = load.loaded, "Applied pre-filter");

    if config.rules.is_empty() {
        warn!("No alert rules configured, nothing to evaluate");
    }

    let in_scope = batch.len();
    let outcomes = evaluate_rules(Arc::new(batch), &config.rules).await?;
    emit_reports(&outcomes, config.output.format, sink)?;

    Ok(RunSummary {
        load,
        in_scope,
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::bucket::Granularity;
    use crate::store::record::tests::{row, store};

    fn batch() -> Arc<RecordBatch> {
        let rows = (0..12)
            .map(|i| row(i + 2, "Error", "com.example.app", "15/03/2023 10:20:00"))
            .collect();
        Arc::new(store().load(rows).unwrap().0)
    }

    #[tokio::test]
    async fn test_outcomes_keep_rule_order() {
        let rules = vec![
            AlertRule::new("sdk_date", Granularity::Minute, 10).named("first"),
            AlertRule::new("sdk_date", Granularity::Hour, 13).named("second"),
            AlertRule::new("sdk_date", Granularity::Day, 1).named("third"),
        ];

        let outcomes = evaluate_rules(batch(), &rules).await.unwrap();
        let names: Vec<String> = outcomes.iter().map(|o| o.rule().label()).collect();

        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(outcomes[0].result().unwrap().len(), 1);
        assert_eq!(outcomes[1].result().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_invalid_rule_does_not_stop_others() {
        let mut broken = AlertRule::new("sdk_date", Granularity::Minute, 1).named("broken");
        broken.granularity = "week".into();
        let rules = vec![broken, AlertRule::new("sdk_date", Granularity::Minute, 1)];

        let outcomes = evaluate_rules(batch(), &rules).await.unwrap();

        assert!(matches!(
            &outcomes[0],
            RuleOutcome::Skipped {
                error: AlertError::InvalidGranularity(_),
                ..
            }
        ));
        assert!(outcomes[1].result().is_some());

        let mut sink: Vec<String> = Vec::new();
        emit_reports(&outcomes, ReportFormat::Text, &mut sink).unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_json_reports_one_line_per_rule() {
        let rules = vec![
            AlertRule::new("sdk_date", Granularity::Minute, 1),
            AlertRule::new("sdk_date", Granularity::Second, 1),
        ];
        let outcomes = evaluate_rules(batch(), &rules).await.unwrap();

        let mut sink: Vec<String> = Vec::new();
        emit_reports(&outcomes, ReportFormat::Json, &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert!(sink[0].starts_with('{'));
    }
}
