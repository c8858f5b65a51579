//! Outbound signaling through the relay's `/signal` endpoint.

use async_trait::async_trait;
use tracing::debug;

use podcall_common::SignalingEnvelope;
use podcall_config::PodcallConfig;

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("network error: {0}")]
    Network(String),

    #[error("relay rejected signal ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait SignalTransport: Send + Sync {
    async fn send(&self, envelope: &SignalingEnvelope) -> Result<(), SignalError>;
}

/// Posts envelopes to the relay with the configured session token.
pub struct RelaySignaler {
    url: String,
    session_token: Option<String>,
    http: reqwest::Client,
}

impl RelaySignaler {
    pub fn new(relay_url: &str, session_token: Option<String>) -> Self {
        Self {
            url: format!("{}/signal", relay_url.trim_end_matches('/')),
            session_token,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &PodcallConfig) -> Self {
        Self::new(&config.client.relay_url, config.client.session_token.clone())
    }
}

#[async_trait]
impl SignalTransport for RelaySignaler {
    async fn send(&self, envelope: &SignalingEnvelope) -> Result<(), SignalError> {
        let mut request = self.http.post(&self.url).json(envelope);
        if let Some(token) = &self.session_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SignalError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body["message"].as_str().map(str::to_string))
                .unwrap_or_default();
            return Err(SignalError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        debug!(to = %envelope.to, kick = envelope.signal.is_kick(), "Signal sent");
        Ok(())
    }
}
