//! Client side of a peer-mesh audio conference.
//!
//! Every participant joins one presence channel, keeps a roster of who else
//! is there, and holds a direct media link to each of them. Negotiation
//! payloads travel through the relay's `/signal` endpoint and come back as
//! broadcasts on the presence channel.

pub mod media;
pub mod peer;
pub mod presence;
pub mod realtime;
pub mod session;
pub mod signaling;
pub mod transport;

#[cfg(test)]
mod testing;

pub use media::{AudioFrame, AudioTrack, CaptureDevice, MediaError, MediaStream};
pub use peer::{EnvelopeOutcome, PeerManager, PeerUpdate, RemoteStream};
pub use presence::{
    ChannelEvent, HttpAuthorizer, MembershipEvent, MembershipTracker, PresenceError,
    PresenceService, PresenceSubscription, PusherPresence, SubscriptionHandle, TrackerState,
};
pub use realtime::{RealtimeClient, RealtimeConfig, RealtimeEvent};
pub use session::{AudioSession, SessionDeps, SessionError, SessionEvent, SessionSnapshot};
pub use signaling::{RelaySignaler, SignalError, SignalTransport};
pub use transport::{
    LinkEvent, LinkEventSink, LinkNotice, PeerConnector, PeerLink, Role, TransportError,
};

#[cfg(feature = "webrtc-transport")]
pub use transport::WebRtcConnector;
