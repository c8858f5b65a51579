//! Incoming protocol message handler.

use tracing::{debug, warn};

use super::types::{events, PusherMessage, RealtimeEvent};

/// What to do with one inbound frame.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Handled {
    pub(crate) event: Option<RealtimeEvent>,
    pub(crate) reply: Option<PusherMessage>,
}

impl Handled {
    fn event(event: RealtimeEvent) -> Self {
        Self {
            event: Some(event),
            reply: None,
        }
    }
}

/// Translate a single inbound frame into an event and/or a reply frame.
pub(crate) fn handle_message(msg: &PusherMessage) -> Handled {
    let channel = msg.channel.clone().unwrap_or_default();

    match msg.event.as_str() {
        events::CONNECTION_ESTABLISHED => {
            let data = msg.data_json();
            match data.get("socket_id").and_then(|s| s.as_str()) {
                Some(socket_id) => {
                    debug!(socket_id, "Connection established");
                    Handled::event(RealtimeEvent::Connected {
                        socket_id: socket_id.to_string(),
                    })
                }
                None => Handled::event(RealtimeEvent::Error(
                    "connection_established without socket_id".into(),
                )),
            }
        }
        events::PING => Handled {
            event: None,
            reply: Some(PusherMessage::new(events::PONG, serde_json::json!({}))),
        },
        events::PONG => Handled::default(),
        events::ERROR => {
            let data = msg.data_json();
            let message = data
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            warn!(code = ?data.get("code"), message = %message, "Server error");
            Handled::event(RealtimeEvent::Error(message))
        }
        events::SUBSCRIPTION_SUCCEEDED => {
            debug!(channel = %channel, "Subscription succeeded");
            Handled::event(RealtimeEvent::Subscribed {
                channel,
                data: msg.data_json(),
            })
        }
        events::SUBSCRIPTION_ERROR => {
            let data = msg.data_json();
            let message = data
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
                .or_else(|| data.as_str().map(str::to_string))
                .unwrap_or_else(|| "subscription rejected".to_string());
            warn!(channel = %channel, message = %message, "Subscription error");
            Handled::event(RealtimeEvent::SubscriptionError { channel, message })
        }
        events::MEMBER_ADDED => Handled::event(RealtimeEvent::MemberAdded {
            channel,
            member: msg.data_json(),
        }),
        events::MEMBER_REMOVED => {
            let data = msg.data_json();
            match data.get("user_id").and_then(|u| u.as_str()) {
                Some(user_id) => Handled::event(RealtimeEvent::MemberRemoved {
                    channel,
                    user_id: user_id.to_string(),
                }),
                None => {
                    debug!(channel = %channel, "member_removed without user_id");
                    Handled::default()
                }
            }
        }
        other if other.starts_with("pusher") => {
            debug!(event = %other, "Unhandled protocol event");
            Handled::default()
        }
        other => {
            if msg.channel.is_none() {
                debug!(event = %other, "Event without channel dropped");
                return Handled::default();
            }
            Handled::event(RealtimeEvent::ChannelEvent {
                channel,
                event: other.to_string(),
                data: msg.data_json(),
            })
        }
    }
}
