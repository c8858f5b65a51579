pub mod envelope;
pub mod errors;
pub mod grant;
pub mod id;
pub mod identity;

pub use envelope::{Signal, SignalingEnvelope, KICK, SIGNAL_EVENT};
pub use errors::{ConfigError, PodcallError};
pub use grant::PresenceGrant;
pub use id::new_guest_id;
pub use identity::{MemberInfo, ParticipantIdentity, PresenceMember};

/// Name of the shared presence channel every participant subscribes to.
pub const DEFAULT_PRESENCE_CHANNEL: &str = "presence-audio";

pub type Result<T> = std::result::Result<T, PodcallError>;
