use crate::cli::CliError;
use crate::config::{load_config, user_config_path, SYSTEM_CONFIG_PATH};
use std::fs;
use std::path::{Path, PathBuf};

const SAMPLE_CONFIG: &str = include_str!("../../samples/config.yml");

pub fn init(stdout: bool) -> Result<(), CliError> {
    if stdout {
        print!("{}", SAMPLE_CONFIG);
        return Ok(());
    }

    // Try ~/.config/logship/config.yml first
    let config_path = match user_config_path() {
        Some(user_config) => match user_config.parent().map(fs::create_dir_all) {
            Some(Err(_)) => {
                eprintln!("Warning: Could not create directory for {}", user_config.display());
                eprintln!("Falling back to {}", SYSTEM_CONFIG_PATH);
                PathBuf::from(SYSTEM_CONFIG_PATH)
            }
            _ => user_config,
        },
        None => PathBuf::from(SYSTEM_CONFIG_PATH),
    };

    write_new_config(&config_path, SAMPLE_CONFIG)?;
    println!("Config file written to {}", config_path.display());
    Ok(())
}

/// Write `content` to `path`, refusing to replace an existing file
pub fn write_new_config(path: &Path, content: &str) -> Result<(), CliError> {
    if path.exists() {
        return Err(CliError::ConfigExists(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn validate(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path.ok_or(CliError::ConfigNotFound)?;

    println!("Validating config file: {}", path.display());
    load_config(&path)?;
    println!("✓ Config is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_config_parses_with_env() {
        std::env::set_var("LOGSHIP_ACCESS_ID", "AKID");
        std::env::set_var("LOGSHIP_SECRET_KEY", "secret");
        let config = crate::config::parse_config(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.destination.domain, "app-logs");
        assert_eq!(config.batching.granularity_ms, 10000);
    }

    #[test]
    fn test_write_new_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.yml");

        write_new_config(&path, "a: 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\n");

        let err = write_new_config(&path, "a: 2\n").unwrap_err();
        assert!(matches!(err, CliError::ConfigExists(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\n");
    }

    #[test]
    fn test_validate_without_path() {
        assert!(matches!(validate(None), Err(CliError::ConfigNotFound)));
    }
}
