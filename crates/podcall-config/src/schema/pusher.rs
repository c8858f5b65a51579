use serde::{Deserialize, Serialize};

/// Credentials for the hosted presence/pub-sub service.
///
/// The relay needs all four values; the client only needs `key`,
/// `cluster` and an optional `ws_host`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PusherConfig {
    pub app_id: String,
    pub key: String,
    pub secret: String,
    pub cluster: String,
    /// WebSocket host override for self-hosted, protocol-compatible servers.
    pub ws_host: Option<String>,
    /// REST API host override.
    pub api_host: Option<String>,
    pub use_tls: bool,
}

impl std::fmt::Debug for PusherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PusherConfig")
            .field("app_id", &self.app_id)
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .field("cluster", &self.cluster)
            .field("ws_host", &self.ws_host)
            .field("api_host", &self.api_host)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl Default for PusherConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            key: String::new(),
            secret: String::new(),
            cluster: "mt1".into(),
            ws_host: None,
            api_host: None,
            use_tls: true,
        }
    }
}

impl PusherConfig {
    pub fn ws_host(&self) -> String {
        self.ws_host
            .clone()
            .unwrap_or_else(|| format!("ws-{}.pusher.com", self.cluster))
    }

    pub fn api_host(&self) -> String {
        self.api_host
            .clone()
            .unwrap_or_else(|| format!("api-{}.pusher.com", self.cluster))
    }

    /// Base URL of the REST API, e.g. `https://api-eu.pusher.com`.
    pub fn api_base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}", self.api_host())
    }

    /// WebSocket URL of the client endpoint for this app key.
    pub fn ws_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!(
            "{scheme}://{}/app/{}?protocol=7&client=podcall-rs&version={}",
            self.ws_host(),
            self.key,
            env!("CARGO_PKG_VERSION")
        )
    }
}
