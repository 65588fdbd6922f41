use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, ENV_VAR_PATTERN};
use regex::Regex;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(err) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), err),
        )),
        other => other,
    })
}

/// Parse and validate a config document. Environment variables are expanded
/// before the YAML is parsed.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);

    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;

    if let Some(file) = config.logging.file.as_mut() {
        *file = expand_tilde(file);
    }
    if let Some(file) = config.store.credentials_file.as_mut() {
        *file = expand_tilde(file);
    }

    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let re = Regex::new(ENV_VAR_PATTERN).expect("env var pattern is valid");
    let mut unexpanded_vars: Vec<String> = re
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with the actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.source.table.trim().is_empty() {
        errors.push("source.table must not be empty".to_string());
    }

    if config.source.timestamp_field.trim().is_empty() {
        errors.push("source.timestamp_field must not be empty".to_string());
    }

    match (
        &config.source.access_key_id,
        &config.source.secret_access_key,
    ) {
        (Some(_), None) => errors.push(
            "source.secret_access_key is required when source.access_key_id is set".to_string(),
        ),
        (None, Some(_)) => errors.push(
            "source.access_key_id is required when source.secret_access_key is set".to_string(),
        ),
        _ => {}
    }

    if config.source.initial_lookback.is_zero() {
        errors.push("source.initial_lookback must be greater than zero".to_string());
    }

    match (&config.store.credentials_file, &config.store.access_token) {
        (Some(_), Some(_)) => errors.push(
            "store.credentials_file and store.access_token are mutually exclusive".to_string(),
        ),
        (Some(path), None) if path.as_os_str().is_empty() => {
            errors.push("store.credentials_file must not be empty when set".to_string())
        }
        _ => {}
    }

    for (field, value) in [
        ("store.access_token", &config.store.access_token),
        ("store.folder_id", &config.store.folder_id),
        ("store.shared_drive_id", &config.store.shared_drive_id),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            errors.push(format!("{} must not be empty when set", field));
        }
    }

    let prefix = &config.export.name_prefix;
    if prefix.trim().is_empty() {
        errors.push("export.name_prefix must not be empty".to_string());
    } else if prefix.contains('/') || prefix.contains('\'') {
        errors.push(format!(
            "export.name_prefix '{}' must not contain '/' or quotes",
            prefix
        ));
    }

    if config.schedule.poll_interval.is_zero() {
        errors.push("schedule.poll_interval must be greater than zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
