//! Channel publisher: pushes server-side events onto the presence channel
//! through the hosted service's REST API.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use podcall_config::PusherConfig;

use crate::auth::hmac_hex;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("network error: {0}")]
    Network(String),

    #[error("service rejected event ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("cannot encode event: {0}")]
    Encode(String),

    #[error("cannot sign request: {0}")]
    Signing(String),
}

#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Publish `data` as `event` on `channel`.
    async fn publish(&self, channel: &str, event: &str, data: &Value) -> Result<(), PublishError>;
}

/// Trigger body. `data` is itself a JSON-encoded string.
#[derive(Serialize)]
struct TriggerBody<'a> {
    name: &'a str,
    channels: [&'a str; 1],
    data: String,
}

pub struct PusherPublisher {
    app_id: String,
    key: String,
    secret: String,
    base_url: String,
    http: reqwest::Client,
}

impl PusherPublisher {
    pub fn from_config(config: &PusherConfig) -> Self {
        Self {
            app_id: config.app_id.clone(),
            key: config.key.clone(),
            secret: config.secret.clone(),
            base_url: config.api_base_url(),
            http: reqwest::Client::new(),
        }
    }

    fn events_path(&self) -> String {
        format!("/apps/{}/events", self.app_id)
    }

    /// Signed trigger URL for `body` at `timestamp` (unix seconds).
    pub fn signed_events_url(&self, body: &str, timestamp: u64) -> Result<String, PublishError> {
        let path = self.events_path();
        let body_md5 = format!("{:x}", md5::compute(body.as_bytes()));
        let query = format!(
            "auth_key={}&auth_timestamp={timestamp}&auth_version=1.0&body_md5={body_md5}",
            self.key
        );
        let signature = hmac_hex(&self.secret, &format!("POST\n{path}\n{query}"))
            .map_err(|e| PublishError::Signing(e.to_string()))?;
        Ok(format!(
            "{}{path}?{query}&auth_signature={signature}",
            self.base_url
        ))
    }
}

#[async_trait]
impl ChannelPublisher for PusherPublisher {
    async fn publish(&self, channel: &str, event: &str, data: &Value) -> Result<(), PublishError> {
        let body = TriggerBody {
            name: event,
            channels: [channel],
            data: serde_json::to_string(data).map_err(|e| PublishError::Encode(e.to_string()))?,
        };
        let body = serde_json::to_string(&body).map_err(|e| PublishError::Encode(e.to_string()))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let url = self.signed_events_url(&body, timestamp)?;

        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(channel, event, "event published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, RawQuery, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    fn config(api_host: Option<String>) -> PusherConfig {
        PusherConfig {
            app_id: "123".into(),
            key: "app-key".into(),
            secret: "app-secret".into(),
            api_host,
            use_tls: false,
            ..Default::default()
        }
    }

    #[test]
    fn signed_url_includes_body_md5_and_signature() {
        let publisher = PusherPublisher::from_config(&config(Some("api.test".into())));
        let url = publisher
            .signed_events_url(r#"{"name":"signal"}"#, 1_700_000_000)
            .unwrap();

        let expected_query = "auth_key=app-key&auth_timestamp=1700000000&auth_version=1.0\
                              &body_md5=674c6e4f36bbabf9a219bbc35ddf07e9";
        let expected_sig =
            hmac_hex("app-secret", &format!("POST\n/apps/123/events\n{expected_query}")).unwrap();
        assert_eq!(
            url,
            format!("http://api.test/apps/123/events?{expected_query}&auth_signature={expected_sig}")
        );
    }

    #[test]
    fn missing_secret_fails_signing() {
        let mut cfg = config(None);
        cfg.secret.clear();
        let publisher = PusherPublisher::from_config(&cfg);
        assert!(matches!(
            publisher.signed_events_url("{}", 1),
            Err(PublishError::Signing(_))
        ));
    }

    #[derive(Clone, Default)]
    struct Received(Arc<Mutex<Vec<(String, String, Value)>>>);

    async fn spawn_fake_service(status: StatusCode) -> (String, Received) {
        async fn events(
            State((status, received)): State<(StatusCode, Received)>,
            Path(app_id): Path<String>,
            RawQuery(query): RawQuery,
            body: String,
        ) -> StatusCode {
            let query = query.unwrap_or_default();
            let (unsigned, signature) = query
                .rsplit_once("&auth_signature=")
                .unwrap_or((query.as_str(), ""));
            let expected = hmac_hex(
                "app-secret",
                &format!("POST\n/apps/{app_id}/events\n{unsigned}"),
            )
            .unwrap();
            if signature != expected {
                return StatusCode::UNAUTHORIZED;
            }
            let parsed: Value = serde_json::from_str(&body).unwrap();
            received
                .0
                .lock()
                .unwrap()
                .push((app_id, query.clone(), parsed));
            status
        }

        let received = Received::default();
        let app = Router::new()
            .route("/apps/{app_id}/events", post(events))
            .with_state((status, received.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr.to_string(), received)
    }

    #[tokio::test]
    async fn publish_posts_signed_trigger() {
        let (host, received) = spawn_fake_service(StatusCode::OK).await;
        let publisher = PusherPublisher::from_config(&config(Some(host)));

        let data = serde_json::json!({"signal": {"type": "offer"}, "to": "b", "from": "a"});
        publisher
            .publish("presence-audio", "signal", &data)
            .await
            .unwrap();

        let received = received.0.lock().unwrap();
        assert_eq!(received.len(), 1);
        let (app_id, query, body) = &received[0];
        assert_eq!(app_id, "123");
        assert!(query.contains("auth_key=app-key"));
        assert_eq!(body["name"], "signal");
        assert_eq!(body["channels"], serde_json::json!(["presence-audio"]));
        let inner: Value = serde_json::from_str(body["data"].as_str().unwrap()).unwrap();
        assert_eq!(inner, data);
    }

    #[tokio::test]
    async fn rejected_trigger_surfaces_status() {
        let (host, _received) = spawn_fake_service(StatusCode::FORBIDDEN).await;
        let publisher = PusherPublisher::from_config(&config(Some(host)));
        let err = publisher
            .publish("presence-audio", "signal", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let publisher = PusherPublisher::from_config(&config(Some("127.0.0.1:9".into())));
        let err = publisher
            .publish("presence-audio", "signal", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Network(_)));
    }
}
