use serde::{Deserialize, Serialize};

use podcall_common::DEFAULT_PRESENCE_CHANNEL;

/// Presence channel subscription settings used by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Presence channel shared by every participant. Must start with `presence-`.
    pub channel: String,
    /// Seconds of silence before the client pings the server.
    pub activity_timeout_secs: u64,
    /// Seconds to wait for the WebSocket handshake.
    pub connect_timeout_secs: u64,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_PRESENCE_CHANNEL.into(),
            activity_timeout_secs: 120,
            connect_timeout_secs: 15,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
        }
    }
}
