use logship::config::{load_config, ConfigError};
use std::fs;
use tempfile::TempDir;

const MINIMAL: &str = r#"
destination:
  domain: app-logs
  endpoint: https://sdb.example.com
credentials:
  access_id: AKID
  secret_key: secret
"#;

#[test]
fn test_load_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(
        &config_path,
        format!("{}batching:\n  granularity_ms: 5000\norigin: web-01\n", MINIMAL),
    )
    .unwrap();

    let config = load_config(&config_path).expect("config should be valid");

    assert_eq!(config.destination.domain, "app-logs");
    assert_eq!(config.batching.granularity_ms, 5000);
    assert_eq!(config.batching.shutdown_timeout_ms, 30000);
    assert_eq!(config.origin.as_deref(), Some("web-01"));
}

#[test]
fn test_sample_config_is_valid() {
    std::env::set_var("LOGSHIP_ACCESS_ID", "AKID");
    std::env::set_var("LOGSHIP_SECRET_KEY", "secret");

    let sample = concat!(env!("CARGO_MANIFEST_DIR"), "/samples/config.yml");
    let config = load_config(std::path::Path::new(sample)).expect("sample config should be valid");

    assert_eq!(config.credentials.access_id, "AKID");
    assert_eq!(config.time_zone, "system");
}

#[test]
fn test_missing_file_names_path() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("absent.yml");

    let err = load_config(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
    assert!(err.to_string().contains("absent.yml"));
}

#[test]
fn test_malformed_yaml_names_path() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.yml");
    fs::write(&config_path, "destination: [unclosed\n").unwrap();

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("broken.yml"));
}

#[test]
fn test_all_validation_errors_reported_together() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(&config_path, "batching:\n  granularity_ms: 0\ntime_zone: Nowhere/Special\n").unwrap();

    match load_config(&config_path) {
        Err(ConfigError::ValidationList(errors)) => {
            // domain, endpoint, access_id, secret_key, granularity, time zone
            assert_eq!(errors.len(), 6);
        }
        other => panic!("expected ValidationList, got {:?}", other),
    }
}
