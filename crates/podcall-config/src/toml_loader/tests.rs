//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_podcall_config.toml"));
    assert!(matches!(
        result.unwrap_err(),
        podcall_common::ConfigError::FileNotFound(_)
    ));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r##"
[pusher]
key = "app-key"
cluster = "eu"

[client]
relay_url = "https://relay.example"
negotiation_timeout_secs = 45
"##,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.pusher.key, "app-key");
    assert_eq!(config.pusher.cluster, "eu");
    assert_eq!(config.client.relay_url, "https://relay.example");
    assert_eq!(config.client.negotiation_timeout_secs, 45);
    // Defaults preserved
    assert_eq!(config.presence.channel, "presence-audio");
    assert_eq!(config.relay.bind, "127.0.0.1:3000");
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, podcall_common::ConfigError::ParseError(_)));
}

#[test]
fn load_with_invalid_values_still_returns_parsed_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[presence]\nactivity_timeout_secs = 5\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.presence.activity_timeout_secs, 5);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("podcall").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.presence.channel, "presence-audio");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::PodcallConfig;

    let config: PodcallConfig = toml::from_str(&default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_config_path_is_reasonable() {
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("podcall"));
        assert!(path_str.ends_with("config.toml"));
    }
}
