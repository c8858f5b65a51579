//! Environment overrides for presence-service credentials.
//!
//! Deployments usually keep the Pusher secret out of the config file, so
//! `PUSHER_APP_ID`, `PUSHER_KEY`, `PUSHER_SECRET` and `PUSHER_CLUSTER`
//! replace the corresponding `[pusher]` values when set and non-empty.

use tracing::debug;

use crate::schema::PodcallConfig;

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut PodcallConfig) {
    apply_overrides_from(config, |name| std::env::var(name).ok());
}

/// Apply overrides using an arbitrary variable lookup.
pub fn apply_overrides_from<F>(config: &mut PodcallConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let fields: [(&str, &mut String); 4] = [
        ("PUSHER_APP_ID", &mut config.pusher.app_id),
        ("PUSHER_KEY", &mut config.pusher.key),
        ("PUSHER_SECRET", &mut config.pusher.secret),
        ("PUSHER_CLUSTER", &mut config.pusher.cluster),
    ];
    for (name, slot) in fields {
        if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
            debug!(var = name, "config value overridden from environment");
            *slot = value;
        }
    }
}
