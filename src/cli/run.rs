use crate::alert::report::{LogSink, StdoutSink};
use crate::config::parse::{load_config, ConfigError};
use crate::config::types::SinkKind;
use crate::config::{expand_tilde, user_config_path, SYSTEM_CONFIG_PATH};
use crate::pipeline::{run_pipeline, PipelineError, RunSummary};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

pub async fn run(
    config_path: Option<PathBuf>,
    input: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            if let Some(user_config) = user_config_path() {
                eprintln!("  {}", user_config.display());
            }
            eprintln!("  {}", SYSTEM_CONFIG_PATH);
            eprintln!("\nUse --config <path> to specify a config file, or run 'logtally config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_with_config(&config_path, input).await?;
    Ok(())
}

/// Run once with the config at `config_path`, optionally overriding the input file.
pub async fn run_with_config(
    config_path: &Path,
    input: Option<PathBuf>,
) -> Result<RunSummary, RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let mut config = load_config(config_path)?;

    if let Some(input) = input {
        config.input.path = expand_tilde(&input);
    }

    info!(
        input = %config.input.path.display(),
        rules = config.rules.len(),
        "Starting run"
    );

    let summary = match config.output.sink {
        SinkKind::Log => run_pipeline(&config, &mut LogSink).await?,
        SinkKind::Stdout => run_pipeline(&config, &mut StdoutSink).await?,
    };

    info!(
        rows = summary.load.rows,
        in_scope = summary.in_scope,
        alerts = summary.alerts(),
        skipped_rules = summary.skipped(),
        "Run complete"
    );

    Ok(summary)
}
