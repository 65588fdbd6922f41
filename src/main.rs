use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hourly-export")]
#[command(about = "Hourly CSV export from DynamoDB to Google Drive", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll, accumulate and sync until interrupted
    Run,
    /// Print a JSON report of the configured services
    Health,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file
    Init {
        #[arg(long)]
        stdout: bool,
    },
    /// Load and validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = hourly_export::config::resolve_config_path(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config_path = hourly_export::cli::run::require_config_path(config_path);
            let config = hourly_export::config::load_config(&config_path);

            // The log file comes from the config, so a bad config logs to stdout only
            let log_file = config.as_ref().ok().and_then(|c| c.logging.file.clone());
            init_tracing(log_file.as_deref())?;

            hourly_export::cli::run::run(&config_path, config?).await?;
        }
        Commands::Health => {
            init_tracing(None)?;
            hourly_export::cli::health::health(config_path)?;
        }
        Commands::Config { action } => {
            init_tracing(None)?;
            match action {
                ConfigAction::Init { stdout } => {
                    hourly_export::cli::config::init(stdout)?;
                }
                ConfigAction::Validate => {
                    hourly_export::cli::config::validate(config_path)?;
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hourly_export=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}
