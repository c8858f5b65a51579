//! Configuration, protocol types, and event/command enums for the realtime client.

use serde::{Deserialize, Serialize};

use podcall_config::PodcallConfig;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for the hosted channel service.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Full WebSocket URL including app key and protocol version.
    pub ws_url: String,
    /// Seconds of inbound silence before we ping the server.
    pub activity_timeout_secs: u64,
    /// Seconds to wait for the WebSocket handshake.
    pub connect_timeout_secs: u64,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
}

impl RealtimeConfig {
    pub fn from_config(config: &PodcallConfig) -> Self {
        Self {
            ws_url: config.pusher.ws_url(),
            activity_timeout_secs: config.presence.activity_timeout_secs,
            connect_timeout_secs: config.presence.connect_timeout_secs,
            reconnect_delay_secs: config.presence.reconnect_delay_secs,
            max_reconnect_delay_secs: config.presence.max_reconnect_delay_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire Protocol
// ---------------------------------------------------------------------------

/// A protocol-7 frame. `data` is usually a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PusherMessage {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PusherMessage {
    pub fn new(event: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            channel: None,
            data,
        }
    }

    /// `data` decoded: string payloads are parsed as JSON, anything else
    /// is returned as-is. Unparseable strings come back as a JSON string.
    pub fn data_json(&self) -> serde_json::Value {
        match &self.data {
            serde_json::Value::String(raw) => serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.clone())),
            other => other.clone(),
        }
    }
}

pub(crate) mod events {
    pub const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
    pub const ERROR: &str = "pusher:error";
    pub const PING: &str = "pusher:ping";
    pub const PONG: &str = "pusher:pong";
    pub const SUBSCRIBE: &str = "pusher:subscribe";
    pub const UNSUBSCRIBE: &str = "pusher:unsubscribe";
    pub const SUBSCRIPTION_ERROR: &str = "pusher:subscription_error";
    pub const SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
    pub const MEMBER_ADDED: &str = "pusher_internal:member_added";
    pub const MEMBER_REMOVED: &str = "pusher_internal:member_removed";
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Events emitted by the realtime client.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// Handshake finished; subscriptions must be authorized for `socket_id`.
    Connected { socket_id: String },
    /// WebSocket connection lost. A reconnect follows unless disconnecting.
    Disconnected,
    /// Subscription confirmed. `data` is the decoded subscription payload.
    Subscribed {
        channel: String,
        data: serde_json::Value,
    },
    SubscriptionError { channel: String, message: String },
    MemberAdded {
        channel: String,
        member: serde_json::Value,
    },
    MemberRemoved { channel: String, user_id: String },
    /// Any non-protocol event on a channel.
    ChannelEvent {
        channel: String,
        event: String,
        data: serde_json::Value,
    },
    Error(String),
}

/// Commands sent to the connection task.
#[derive(Debug)]
pub(crate) enum RealtimeCommand {
    Subscribe {
        channel: String,
        auth: String,
        channel_data: String,
    },
    Unsubscribe {
        channel: String,
    },
    Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_data_is_decoded() {
        let msg: PusherMessage = serde_json::from_str(
            r#"{"event":"signal","channel":"presence-audio","data":"{\"to\":\"b\"}"}"#,
        )
        .unwrap();
        assert_eq!(msg.data_json(), serde_json::json!({"to": "b"}));
    }

    #[test]
    fn object_data_passes_through() {
        let msg = PusherMessage::new("pusher:ping", serde_json::json!({}));
        assert_eq!(msg.data_json(), serde_json::json!({}));
    }

    #[test]
    fn channel_is_omitted_when_absent() {
        let json = serde_json::to_string(&PusherMessage::new("pusher:pong", serde_json::json!({})))
            .unwrap();
        assert_eq!(json, r#"{"event":"pusher:pong","data":{}}"#);
    }

    #[test]
    fn config_is_derived_from_podcall_config() {
        let mut config = PodcallConfig::default();
        config.pusher.key = "k".into();
        let rt = RealtimeConfig::from_config(&config);
        assert!(rt.ws_url.contains("/app/k?protocol=7"));
        assert_eq!(rt.connect_timeout_secs, 15);
    }
}
