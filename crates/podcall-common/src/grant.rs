use serde::{Deserialize, Serialize};

use crate::identity::ParticipantIdentity;

/// Signed presence membership grant, as returned by the auth endpoint.
///
/// `channel_data` is the JSON-encoded member record; the presence service
/// verifies `auth` against it before admitting the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceGrant {
    pub auth: String,
    pub channel_data: String,
}

impl PresenceGrant {
    /// Decode the identity embedded in `channel_data`.
    pub fn identity(&self) -> Result<ParticipantIdentity, serde_json::Error> {
        serde_json::from_str(&self.channel_data)
    }
}
