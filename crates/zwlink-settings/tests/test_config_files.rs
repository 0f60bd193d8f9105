use tempfile::tempdir;
use zwlink_core::{ConfigError, Error};
use zwlink_settings::LinkConfig;

#[test]
fn test_toml_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = LinkConfig::default();
    config.serial.port = "/dev/ttyUSB3".to_string();
    config.timing.reply_timeout_ms = 2000;
    config.save_to_file(&path).unwrap();

    let loaded = LinkConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip_in_new_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("link.json");

    let mut config = LinkConfig::default();
    config.retry.max_retries = 1;
    config.save_to_file(&path).unwrap();

    assert_eq!(LinkConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "serial: {}").unwrap();

    match LinkConfig::load_from_file(&path) {
        Err(Error::Config(ConfigError::UnsupportedFormat(ext))) => assert_eq!(ext, "yaml"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[timing]\nreply_timeout_ms = 0\n").unwrap();

    assert!(matches!(
        LinkConfig::load_from_file(&path),
        Err(Error::Config(ConfigError::Invalid { .. }))
    ));
}

#[test]
fn test_unbounded_retry_count_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[retry]\nmax_retries = 4294967295\n").unwrap();

    match LinkConfig::load_from_file(&path) {
        Err(Error::Config(ConfigError::Invalid { key, .. })) => assert_eq!(key, "retry.max_retries"),
        other => panic!("expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        LinkConfig::load_from_file(&path),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert_eq!(
        LinkConfig::load_or_default(&path).unwrap(),
        LinkConfig::default()
    );
}
