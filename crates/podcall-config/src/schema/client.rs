use serde::{Deserialize, Serialize};

/// Mesh client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the relay server (`/auth` and `/signal` live under it).
    pub relay_url: String,
    /// Bearer token for the relay's session provider. Guests leave this unset.
    pub session_token: Option<String>,
    /// Seconds a peer may take to produce remote audio before it is dropped.
    /// `0` disables the timeout.
    pub negotiation_timeout_secs: u64,
    /// STUN/TURN URLs handed to the media transport.
    pub ice_servers: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:3000".into(),
            session_token: None,
            negotiation_timeout_secs: 30,
            ice_servers: vec!["stun:stun.l.google.com:19302".into()],
        }
    }
}
