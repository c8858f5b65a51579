//! Presence authenticator: turns a subscribe handshake into a signed grant.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use podcall_common::{new_guest_id, ParticipantIdentity, PresenceGrant};

use crate::error::RelayError;
use crate::session::SessionUser;

type HmacSha256 = Hmac<Sha256>;

const GUEST_NAME: &str = "Guest";
const MEMBER_NAME: &str = "User";

pub struct PresenceAuthenticator {
    key: String,
    secret: String,
    channel: String,
}

impl PresenceAuthenticator {
    pub fn new(
        key: impl Into<String>,
        secret: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Decide who the caller is. A resolved session always wins; otherwise
    /// a fresh guest id is minted with the supplied name or "Guest".
    pub fn identity_for(
        session: Option<&SessionUser>,
        username: Option<&str>,
    ) -> ParticipantIdentity {
        match session {
            Some(user) => ParticipantIdentity::member(
                user.id.clone(),
                user.name.clone().unwrap_or_else(|| MEMBER_NAME.to_string()),
            ),
            None => {
                let name = username
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(GUEST_NAME);
                ParticipantIdentity::guest(new_guest_id(), name)
            }
        }
    }

    /// Sign a presence subscription for `identity` on `channel`.
    pub fn authorize(
        &self,
        socket_id: &str,
        channel: &str,
        identity: &ParticipantIdentity,
    ) -> Result<PresenceGrant, RelayError> {
        if channel != self.channel {
            return Err(RelayError::ForbiddenChannel(channel.to_string()));
        }
        if self.key.is_empty() {
            return Err(RelayError::Misconfigured("presence app key is not set".into()));
        }

        let channel_data = serde_json::to_string(identity)
            .map_err(|e| RelayError::Misconfigured(format!("cannot encode identity: {e}")))?;
        let signature = self.sign(&format!("{socket_id}:{channel}:{channel_data}"))?;

        Ok(PresenceGrant {
            auth: format!("{}:{signature}", self.key),
            channel_data,
        })
    }

    /// Hex HMAC-SHA256 of `payload` under the app secret.
    pub fn sign(&self, payload: &str) -> Result<String, RelayError> {
        hmac_hex(&self.secret, payload)
    }
}

pub(crate) fn hmac_hex(secret: &str, payload: &str) -> Result<String, RelayError> {
    if secret.is_empty() {
        return Err(RelayError::Misconfigured("presence app secret is not set".into()));
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| RelayError::Misconfigured(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(to_hex(&mac.finalize().into_bytes()))
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
