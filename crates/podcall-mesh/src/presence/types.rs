//! Presence service seam, subscription and event types.

use async_trait::async_trait;
use tokio::sync::mpsc;

use podcall_common::{MemberInfo, ParticipantIdentity, SignalingEnvelope};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("subscription rejected: {0}")]
    Rejected(String),

    #[error("malformed grant: {0}")]
    Grant(String),

    #[error("timed out joining presence channel")]
    Timeout,

    #[error("presence connection closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What the presence channel reports after the initial subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// (Re)subscribed. `members` is the full member list, self included.
    Subscribed {
        me: ParticipantIdentity,
        members: Vec<ParticipantIdentity>,
    },
    MemberAdded(ParticipantIdentity),
    MemberRemoved { id: String },
    /// A signaling envelope broadcast on the channel, not yet filtered by `to`.
    Signal(SignalingEnvelope),
    /// Transport dropped; a fresh `Subscribed` follows if it comes back.
    ConnectionLost,
    Error(String),
}

// ---------------------------------------------------------------------------
// Service seam
// ---------------------------------------------------------------------------

/// A live presence membership.
pub struct PresenceSubscription {
    pub me: ParticipantIdentity,
    /// Every member at subscribe time, self included.
    pub members: Vec<ParticipantIdentity>,
    pub events: mpsc::Receiver<ChannelEvent>,
    pub handle: Box<dyn SubscriptionHandle>,
}

impl std::fmt::Debug for PresenceSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSubscription")
            .field("me", &self.me)
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait SubscriptionHandle: Send {
    /// Unsubscribe and close the connection. Safe to call more than once.
    async fn leave(&mut self);
}

#[async_trait]
pub trait PresenceService: Send + Sync {
    /// Authorize and subscribe as `display_name`. Returns once the
    /// subscription is confirmed; authorization failures are fatal.
    async fn join(&self, display_name: &str) -> Result<PresenceSubscription, PresenceError>;
}

/// Build an identity from a wire `user_id` and `user_info` object,
/// tolerating missing or malformed info.
pub(crate) fn member_from(user_id: &str, info: Option<&serde_json::Value>) -> ParticipantIdentity {
    let info: Option<MemberInfo> = info.and_then(|v| serde_json::from_value(v.clone()).ok());
    match info {
        Some(info) if info.is_guest => ParticipantIdentity::guest(user_id, info.name),
        Some(info) => ParticipantIdentity::member(user_id, info.name),
        None => ParticipantIdentity::member(user_id, ""),
    }
}

/// Parse the `presence` block of a subscription-succeeded payload into a
/// member list ordered by `ids`.
pub(crate) fn members_from_subscription(data: &serde_json::Value) -> Vec<ParticipantIdentity> {
    let presence = &data["presence"];
    let hash = &presence["hash"];
    match presence["ids"].as_array() {
        Some(ids) => ids
            .iter()
            .filter_map(|id| id.as_str())
            .map(|id| member_from(id, hash.get(id)))
            .collect(),
        None => hash
            .as_object()
            .map(|obj| obj.iter().map(|(id, info)| member_from(id, Some(info))).collect())
            .unwrap_or_default(),
    }
}
