//! Session events, snapshot and errors.

use podcall_common::ParticipantIdentity;

use crate::media::{MediaError, MediaStream};
use crate::peer::RemoteStream;
use crate::presence::PresenceError;

/// What the hosting UI hears about while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PeerJoined(ParticipantIdentity),
    PeerLeft(ParticipantIdentity),
    RemoteStreamAdded { peer_id: String, stream: MediaStream },
    RemoteStreamRemoved { peer_id: String },
    /// Another participant removed us. `Stopped` follows.
    Kicked { by: String },
    /// The session is over and every resource is released.
    Stopped,
    Error(String),
}

/// Point-in-time view for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub me: Option<ParticipantIdentity>,
    pub connected_users: Vec<ParticipantIdentity>,
    pub remote_streams: Vec<RemoteStream>,
    pub is_active: bool,
    pub is_muted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("could not access microphone: {0}")]
    Device(#[from] MediaError),

    #[error("could not connect: {0}")]
    Auth(#[from] PresenceError),

    #[error("session already active")]
    AlreadyActive,
}
