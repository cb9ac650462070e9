use super::types::*;
use crate::config::{expand_env_vars, unexpanded_env_vars};
use crate::shipper::window::Granularity;
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
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate a config document after `$env{..}` expansion
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let config: Config = serde_yaml::from_str(&yaml_string)?;
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    // Comment lines may mention the syntax without meaning a variable
    let content: Vec<&str> = yaml_string
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect();
    let unexpanded_vars = unexpanded_env_vars(&content.join("\n"));

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

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

    // Without a destination and credentials the shipper must not start
    if config.destination.domain.trim().is_empty() {
        errors.push("destination.domain is required".to_string());
    }
    if config.destination.endpoint.trim().is_empty() {
        errors.push("destination.endpoint is required".to_string());
    } else if !config.destination.endpoint.starts_with("http://")
        && !config.destination.endpoint.starts_with("https://")
    {
        errors.push(format!(
            "destination.endpoint '{}' must start with http:// or https://",
            config.destination.endpoint
        ));
    }
    if config.destination.timeout_ms == 0 {
        errors.push("destination.timeout_ms must be greater than zero".to_string());
    }

    if config.credentials.access_id.trim().is_empty() {
        errors.push("credentials.access_id is required".to_string());
    }
    if config.credentials.secret_key.trim().is_empty() {
        errors.push("credentials.secret_key is required".to_string());
    }

    if let Err(e) = Granularity::from_millis(config.batching.granularity_ms) {
        errors.push(format!("batching.granularity_ms: {}", e));
    }

    if let Err(e) = config.time_zone_setting() {
        errors.push(format!("time_zone: {}", e));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
