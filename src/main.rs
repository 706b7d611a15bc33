use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logtally")]
#[command(about = "Threshold alerts over time-bucketed SDK event logs", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        /// Input CSV, overriding input.path from the config
        #[arg(long)]
        input: Option<PathBuf>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logtally=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = logtally::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { input }) => {
            logtally::cli::run::run(config_path, input).await?;
        }
        None => {
            // Default behavior is to run
            logtally::cli::run::run(config_path, None).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                logtally::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                logtally::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
