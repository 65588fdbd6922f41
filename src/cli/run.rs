use crate::batch::HourlyAccumulator;
use crate::config::Config;
use crate::scheduler::{Driver, SystemClock};
use crate::source::{DynamoTable, RowSourceAdapter};
use crate::sync::{token_source, ArtifactSyncClient, DriveStore, StoreError, TokenCache};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to build artifact store client: {0}")]
    Store(#[from] StoreError),

    #[error("cannot access shared drive {drive_id}: {source}")]
    SharedDrive {
        drive_id: String,
        #[source]
        source: StoreError,
    },
}

/// The resolved config path, or exit listing the searched locations.
pub fn require_config_path(config_path: Option<PathBuf>) -> PathBuf {
    match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/hourly-export/config.yml");
            eprintln!("  /etc/hourly-export/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'hourly-export config init' to generate one.");
            std::process::exit(1);
        }
    }
}

pub async fn run(config_path: &Path, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    run_export(config_path, config).await.map_err(|e| e.into())
}

async fn run_export(config_path: &Path, config: Config) -> Result<(), RunError> {
    info!(
        config_path = %config_path.display(),
        table = %config.source.table,
        region = %config.source.region,
        "Starting hourly export"
    );

    let tokens = TokenCache::new(token_source(&config.store).await?);
    let store = DriveStore::new(&config.store, tokens)?;
    store.check_credentials().await?;

    if let Some(drive_id) = &config.store.shared_drive_id {
        match store.verify_shared_drive().await {
            Ok(name) => info!(
                drive_id = %drive_id,
                name = %name.unwrap_or_default(),
                "Verified access to shared drive"
            ),
            Err(source) => {
                warn!("Make sure the account has been added to the shared drive with write access");
                return Err(RunError::SharedDrive {
                    drive_id: drive_id.clone(),
                    source,
                });
            }
        }
    }

    let table = DynamoTable::connect(&config.source).await;
    let source = RowSourceAdapter::new(table, config.source.initial_lookback);
    let accumulator =
        HourlyAccumulator::new(config.export.name_prefix.clone(), config.export.label_zone);

    let mut driver = Driver::new(
        source,
        accumulator,
        ArtifactSyncClient::new(store),
        SystemClock,
        config.schedule.poll_interval,
    );

    info!("Export running, press Ctrl+C to stop");
    driver.run(shutdown_signal()).await;
    info!("Export stopped");

    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
