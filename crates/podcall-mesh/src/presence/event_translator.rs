//! Background task that translates `RealtimeEvent`s into `ChannelEvent`s.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use podcall_common::{ParticipantIdentity, SignalingEnvelope, SIGNAL_EVENT};

use crate::realtime::{RealtimeClient, RealtimeEvent};

use super::authorizer::HttpAuthorizer;
use super::types::{member_from, members_from_subscription, ChannelEvent};

/// Everything the translator needs to resubscribe after a reconnect.
pub(crate) struct Resubscribe {
    pub(crate) client: RealtimeClient,
    pub(crate) authorizer: Arc<HttpAuthorizer>,
    pub(crate) channel: String,
    pub(crate) display_name: String,
}

// ---------------------------------------------------------------------------
// Event Translator
// ---------------------------------------------------------------------------

/// Runs until the realtime connection closes or nobody listens anymore.
pub(crate) async fn event_translator(
    mut rt_rx: mpsc::Receiver<RealtimeEvent>,
    event_tx: mpsc::Sender<ChannelEvent>,
    resubscribe: Resubscribe,
    mut me: ParticipantIdentity,
) {
    let mut subscribed = true;

    while let Some(rt_event) = rt_rx.recv().await {
        let event = match rt_event {
            RealtimeEvent::Connected { socket_id } => {
                info!(socket_id = %socket_id, "Reconnected, reauthorizing");
                match resubscribe
                    .authorizer
                    .authorize(&socket_id, &resubscribe.channel, &resubscribe.display_name)
                    .await
                {
                    Ok(grant) => {
                        match grant.identity() {
                            Ok(identity) => me = identity,
                            Err(e) => warn!(error = %e, "Grant without identity, keeping previous"),
                        }
                        resubscribe
                            .client
                            .subscribe(&resubscribe.channel, &grant.auth, &grant.channel_data)
                            .await;
                        None
                    }
                    Err(e) => Some(ChannelEvent::Error(e.to_string())),
                }
            }
            RealtimeEvent::Subscribed { channel, data } if channel == resubscribe.channel => {
                subscribed = true;
                Some(ChannelEvent::Subscribed {
                    me: me.clone(),
                    members: members_from_subscription(&data),
                })
            }
            RealtimeEvent::Disconnected => {
                if subscribed {
                    subscribed = false;
                    Some(ChannelEvent::ConnectionLost)
                } else {
                    None
                }
            }
            RealtimeEvent::MemberAdded { channel, member } if channel == resubscribe.channel => {
                match member.get("user_id").and_then(|u| u.as_str()) {
                    Some(user_id) => Some(ChannelEvent::MemberAdded(member_from(
                        user_id,
                        member.get("user_info"),
                    ))),
                    None => {
                        debug!("member_added without user_id");
                        None
                    }
                }
            }
            RealtimeEvent::MemberRemoved { channel, user_id } if channel == resubscribe.channel => {
                Some(ChannelEvent::MemberRemoved { id: user_id })
            }
            RealtimeEvent::ChannelEvent {
                channel,
                event,
                data,
            } if channel == resubscribe.channel && event == SIGNAL_EVENT => {
                match serde_json::from_value::<SignalingEnvelope>(data) {
                    Ok(envelope) => Some(ChannelEvent::Signal(envelope)),
                    Err(e) => {
                        debug!(error = %e, "Dropping malformed signaling envelope");
                        None
                    }
                }
            }
            RealtimeEvent::SubscriptionError { message, .. } => Some(ChannelEvent::Error(message)),
            RealtimeEvent::Error(message) => Some(ChannelEvent::Error(message)),
            other => {
                debug!(?other, "Ignoring event for another channel");
                None
            }
        };

        if let Some(event) = event {
            if event_tx.send(event).await.is_err() {
                debug!("Presence listener gone, closing connection");
                resubscribe.client.disconnect().await;
                return;
            }
        }
    }
}
