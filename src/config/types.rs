use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// DynamoDB table the rows are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub table: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
    /// Static credentials; when omitted the default AWS provider chain is used.
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Override for DynamoDB Local or other compatible endpoints.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_lookback", with = "humantime_serde")]
    pub initial_lookback: Duration,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_timestamp_field() -> String {
    "datetime_utc".to_string()
}

fn default_lookback() -> Duration {
    Duration::from_secs(3600)
}

/// Google Drive destination.
///
/// Credentials come from `credentials_file` (a service account key), or from
/// a fixed `access_token`, or, with neither set, from the application default
/// credentials (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud user credentials or
/// the metadata server).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Used as is and never refreshed. Only for short runs and testing.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub shared_drive_id: Option<String>,
    #[serde(default = "default_store_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_upload_base")]
    pub upload_base: String,
}

fn default_store_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default)]
    pub label_zone: LabelZone,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            label_zone: LabelZone::default(),
        }
    }
}

fn default_name_prefix() -> String {
    "locness_data".to_string()
}

/// Clock used to derive hour labels for bucket and file names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelZone {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write log lines to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,
}
