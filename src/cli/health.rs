use crate::config::Config;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub version: String,
    pub host: String,
    pub environment: BTreeMap<&'static str, String>,
    pub services: BTreeMap<&'static str, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Report on the configuration without contacting either service.
pub fn health_report(config: &Config) -> HealthReport {
    let mut status = HealthStatus::Healthy;
    let mut environment = BTreeMap::new();
    let mut services = BTreeMap::new();

    environment.insert("aws_region", config.source.region.clone());
    environment.insert("dynamodb_table", config.source.table.clone());
    environment.insert(
        "drive_folder",
        config
            .store
            .folder_id
            .clone()
            .unwrap_or_else(|| "not_set".to_string()),
    );
    environment.insert(
        "shared_drive",
        config
            .store
            .shared_drive_id
            .clone()
            .unwrap_or_else(|| "not_set".to_string()),
    );
    environment.insert("name_prefix", config.export.name_prefix.clone());
    environment.insert(
        "poll_interval",
        humantime_serde::re::humantime::format_duration(config.schedule.poll_interval).to_string(),
    );

    let aws = if config.source.access_key_id.is_some() {
        "configured"
    } else {
        "default_chain"
    };
    services.insert("aws", aws.to_string());

    let google_credentials = match (&config.store.credentials_file, &config.store.access_token) {
        (Some(_), _) => "service_account",
        (None, Some(_)) => {
            status = HealthStatus::Degraded;
            "static_token"
        }
        (None, None) => "application_default",
    };
    services.insert("google_credentials", google_credentials.to_string());

    if config.store.folder_id.is_none() && config.store.shared_drive_id.is_none() {
        status = HealthStatus::Degraded;
        services.insert("google_drive", "no_parent_container".to_string());
    } else {
        services.insert("google_drive", "configured".to_string());
    }

    HealthReport {
        status,
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        host: hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string()),
        environment,
        services,
    }
}

pub fn health(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.ok_or("No config file found. Use --config to specify a path.")?;
    let config = crate::config::load_config(&path)?;
    let report = health_report(&config);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
