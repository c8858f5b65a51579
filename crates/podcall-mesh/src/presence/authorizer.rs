//! Channel authorization against the relay's `/auth` endpoint.

use podcall_common::PresenceGrant;
use podcall_config::PodcallConfig;
use tracing::debug;

use super::types::PresenceError;

pub struct HttpAuthorizer {
    endpoint: String,
    session_token: Option<String>,
    http: reqwest::Client,
}

impl HttpAuthorizer {
    pub fn new(endpoint: impl Into<String>, session_token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            session_token,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &PodcallConfig) -> Self {
        Self::new(
            format!("{}/auth", config.client.relay_url.trim_end_matches('/')),
            config.client.session_token.clone(),
        )
    }

    /// Request a signed grant for `socket_id` on `channel`.
    pub async fn authorize(
        &self,
        socket_id: &str,
        channel: &str,
        username: &str,
    ) -> Result<PresenceGrant, PresenceError> {
        let mut request = self.http.post(&self.endpoint).form(&[
            ("socket_id", socket_id),
            ("channel_name", channel),
            ("username", username),
        ]);
        if let Some(token) = &self.session_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PresenceError::Auth(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PresenceError::Auth(format!("auth endpoint returned {status}")));
        }

        let grant: PresenceGrant = response
            .json()
            .await
            .map_err(|e| PresenceError::Grant(e.to_string()))?;
        debug!(socket_id, channel, "channel authorized");
        Ok(grant)
    }
}
