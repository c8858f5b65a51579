//! Full configuration validation.
//!
//! Each check pushes a message instead of returning early so one pass
//! reports every problem as a single `ConfigError`.

mod helpers;


use std::collections::HashSet;

use crate::schema::PodcallConfig;
use podcall_common::ConfigError;

use helpers::validate_range;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PodcallConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_presence(&mut errors, config);
    validate_relay(&mut errors, config);
    validate_client(&mut errors, config);
    validate_logging(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_presence(errors: &mut Vec<String>, config: &PodcallConfig) {
    let p = &config.presence;
    if !p.channel.starts_with("presence-") {
        errors.push(format!(
            "presence.channel = {:?} must start with \"presence-\"",
            p.channel
        ));
    }
    validate_range(errors, "presence.activity_timeout_secs", p.activity_timeout_secs, 10, 600);
    validate_range(errors, "presence.connect_timeout_secs", p.connect_timeout_secs, 1, 120);
    validate_range(errors, "presence.reconnect_delay_secs", p.reconnect_delay_secs, 1, 60);
    if p.max_reconnect_delay_secs < p.reconnect_delay_secs {
        errors.push(format!(
            "presence.max_reconnect_delay_secs = {} is below reconnect_delay_secs = {}",
            p.max_reconnect_delay_secs, p.reconnect_delay_secs
        ));
    }
}

fn validate_relay(errors: &mut Vec<String>, config: &PodcallConfig) {
    if config.relay.bind.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!(
            "relay.bind = {:?} is not a socket address",
            config.relay.bind
        ));
    }
    let mut seen = HashSet::new();
    for (i, entry) in config.relay.sessions.iter().enumerate() {
        if entry.token.is_empty() {
            errors.push(format!("relay.sessions[{i}].token must not be empty"));
        } else if !seen.insert(entry.token.as_str()) {
            errors.push(format!("relay.sessions[{i}].token is a duplicate"));
        }
        if entry.user_id.is_empty() {
            errors.push(format!("relay.sessions[{i}].user_id must not be empty"));
        }
    }
}

fn validate_client(errors: &mut Vec<String>, config: &PodcallConfig) {
    let c = &config.client;
    if !(c.relay_url.starts_with("http://") || c.relay_url.starts_with("https://")) {
        errors.push(format!(
            "client.relay_url = {:?} must be an http(s) URL",
            c.relay_url
        ));
    }
    validate_range(errors, "client.negotiation_timeout_secs", c.negotiation_timeout_secs, 0, 600);
}

fn validate_logging(errors: &mut Vec<String>, config: &PodcallConfig) {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(format!(
            "logging.level = {:?} must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }
}
