pub mod runner;

pub use runner::{
    emit_reports, evaluate_rules, load_batch, run_pipeline, PipelineError, RuleOutcome,
    RunSummary,
};
