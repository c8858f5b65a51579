//! Podcall configuration system.
//!
//! TOML-based configuration shared by the relay server and the mesh
//! client. All sections use `serde(default)` so partial configs work out
//! of the box; Pusher credentials can also come from the environment.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use podcall_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod env;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use env::{apply_env_overrides, apply_overrides_from};
pub use schema::{
    ClientConfig, LoggingConfig, PodcallConfig, PresenceConfig, PusherConfig, RelayConfig,
    SessionEntry, CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use podcall_common::ConfigError;

/// Load config from the platform default path, apply environment
/// overrides, and validate the result.
pub fn load_config() -> Result<PodcallConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Same as [`load_config`] but reads an explicit file.
pub fn load_config_from(path: &Path) -> Result<PodcallConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string with secrets masked.
pub fn config_to_json(config: &PodcallConfig) -> String {
    let mut redacted = config.clone();
    if !redacted.pusher.secret.is_empty() {
        redacted.pusher.secret = "[REDACTED]".into();
    }
    for entry in &mut redacted.relay.sessions {
        entry.token = "[REDACTED]".into();
    }
    if redacted.client.session_token.is_some() {
        redacted.client.session_token = Some("[REDACTED]".into());
    }
    serde_json::to_string_pretty(&redacted)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
