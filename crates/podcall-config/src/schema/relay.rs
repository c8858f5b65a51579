use serde::{Deserialize, Serialize};

/// Configuration for the signaling relay / presence authenticator server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Socket address the HTTP server binds to.
    pub bind: String,
    /// External session endpoint (e.g. `https://app.example/api/auth/session`).
    /// When set, request cookies are forwarded there to resolve the caller.
    pub session_endpoint: Option<String>,
    /// Static bearer tokens, used when no session endpoint is configured.
    pub sessions: Vec<SessionEntry>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
            session_endpoint: None,
            sessions: Vec::new(),
        }
    }
}

/// One statically configured session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
}
