//! HTTP surface of the relay: `/auth`, `/signal` and `/health`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use podcall_common::{PresenceGrant, SignalingEnvelope, SIGNAL_EVENT};

use crate::auth::PresenceAuthenticator;
use crate::error::RelayError;
use crate::publisher::ChannelPublisher;
use crate::session::SessionProvider;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<PresenceAuthenticator>,
    pub sessions: Arc<dyn SessionProvider>,
    pub publisher: Arc<dyn ChannelPublisher>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth", post(authorize))
        .route("/signal", post(signal))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct AuthForm {
    socket_id: Option<String>,
    channel_name: Option<String>,
    username: Option<String>,
}

async fn authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AuthForm>,
) -> Result<Json<PresenceGrant>, RelayError> {
    let (Some(socket_id), Some(channel)) = (
        form.socket_id.filter(|s| !s.is_empty()),
        form.channel_name.filter(|c| !c.is_empty()),
    ) else {
        return Err(RelayError::MissingFields);
    };

    // A broken session lookup degrades to a guest grant.
    let session = match state.sessions.resolve(&headers).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "session lookup failed, treating caller as guest");
            None
        }
    };

    let identity = PresenceAuthenticator::identity_for(session.as_ref(), form.username.as_deref());
    let grant = state.authenticator.authorize(&socket_id, &channel, &identity)?;
    info!(
        participant = %identity.id,
        guest = identity.is_guest,
        channel = %channel,
        "presence subscription authorized"
    );
    Ok(Json(grant))
}

async fn signal(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let user = match state.sessions.resolve(&headers).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(RelayError::Unauthorized),
        Err(e) => {
            warn!(error = %e, "session lookup failed");
            return Err(RelayError::Unauthorized);
        }
    };

    let envelope = parse_envelope(&body).ok_or(RelayError::MissingFields)?;
    if envelope.from != user.id {
        debug!(user = %user.id, from = %envelope.from, "sender id differs from session user");
    }

    let data = serde_json::to_value(&envelope)
        .map_err(|e| RelayError::Misconfigured(format!("cannot encode envelope: {e}")))?;
    state
        .publisher
        .publish(state.authenticator.channel(), SIGNAL_EVENT, &data)
        .await?;

    debug!(
        from = %envelope.from,
        to = %envelope.to,
        kick = envelope.signal.is_kick(),
        "signal relayed"
    );
    Ok(Json(serde_json::json!({ "message": "Signal sent" })))
}

async fn health() -> &'static str {
    "ok"
}

/// Parse `{signal, to, from}`. A field is missing when it is absent, null,
/// `false`, `0` or an empty string; `to` and `from` must be strings.
fn parse_envelope(body: &[u8]) -> Option<SignalingEnvelope> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let signal = value.get("signal").filter(|v| is_present(v))?;
    let to = value.get("to").and_then(Value::as_str).filter(|s| !s.is_empty())?;
    let from = value.get("from").and_then(Value::as_str).filter(|s| !s.is_empty())?;
    Some(SignalingEnvelope::payload(signal.clone(), to, from))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::PublishError;
    use crate::session::{SessionError, SessionUser, TokenSessionProvider};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use podcall_common::ParticipantIdentity;
    use podcall_config::SessionEntry;
    use std::sync::Mutex;
    use tower::ServiceExt;

    const KEY: &str = "app-key";
    const SECRET: &str = "app-secret";
    const CHANNEL: &str = "presence-audio";

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, String, Value)>>,
        fail: bool,
    }

    #[async_trait]
    impl ChannelPublisher for RecordingPublisher {
        async fn publish(
            &self,
            channel: &str,
            event: &str,
            data: &Value,
        ) -> Result<(), PublishError> {
            if self.fail {
                return Err(PublishError::Network("connection refused".into()));
            }
            self.published
                .lock()
                .unwrap()
                .push((channel.into(), event.into(), data.clone()));
            Ok(())
        }
    }

    struct BrokenSessions;

    #[async_trait]
    impl SessionProvider for BrokenSessions {
        async fn resolve(&self, _: &HeaderMap) -> Result<Option<SessionUser>, SessionError> {
            Err(SessionError::Unreachable("down".into()))
        }
    }

    fn sessions() -> Arc<dyn SessionProvider> {
        Arc::new(TokenSessionProvider::new(&[SessionEntry {
            token: "tok-alice".into(),
            user_id: "alice-id".into(),
            name: Some("Alice".into()),
        }]))
    }

    fn app_with(
        sessions: Arc<dyn SessionProvider>,
        publisher: Arc<RecordingPublisher>,
        secret: &str,
    ) -> Router {
        router(AppState {
            authenticator: Arc::new(PresenceAuthenticator::new(KEY, secret, CHANNEL)),
            sessions,
            publisher,
        })
    }

    fn app(publisher: Arc<RecordingPublisher>) -> Router {
        app_with(sessions(), publisher, SECRET)
    }

    fn form_request(body: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/auth")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn signal_request(body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/signal")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn read(resp: axum::response::Response) -> (StatusCode, Value) {
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn guest_auth_issues_signed_guest_grant() {
        let resp = app(Arc::default())
            .oneshot(form_request(
                "socket_id=123.456&channel_name=presence-audio&username=Bob",
                None,
            ))
            .await
            .unwrap();
        let (status, body) = read(resp).await;
        assert_eq!(status, StatusCode::OK);

        let channel_data = body["channel_data"].as_str().unwrap();
        let who: ParticipantIdentity = serde_json::from_str(channel_data).unwrap();
        assert!(who.is_guest);
        assert_eq!(who.display_name, "Bob");
        assert!(who.id.starts_with("guest-"));

        let expected = PresenceAuthenticator::new(KEY, SECRET, CHANNEL)
            .sign(&format!("123.456:presence-audio:{channel_data}"))
            .unwrap();
        assert_eq!(body["auth"], format!("{KEY}:{expected}"));
    }

    #[tokio::test]
    async fn guest_without_username_is_named_guest() {
        let resp = app(Arc::default())
            .oneshot(form_request("socket_id=1.2&channel_name=presence-audio", None))
            .await
            .unwrap();
        let (_, body) = read(resp).await;
        let who: ParticipantIdentity =
            serde_json::from_str(body["channel_data"].as_str().unwrap()).unwrap();
        assert_eq!(who.display_name, "Guest");
    }

    #[tokio::test]
    async fn session_user_is_not_a_guest() {
        let resp = app(Arc::default())
            .oneshot(form_request(
                "socket_id=1.2&channel_name=presence-audio&username=Mallory",
                Some("tok-alice"),
            ))
            .await
            .unwrap();
        let (status, body) = read(resp).await;
        assert_eq!(status, StatusCode::OK);
        let who: ParticipantIdentity =
            serde_json::from_str(body["channel_data"].as_str().unwrap()).unwrap();
        assert_eq!(who, ParticipantIdentity::member("alice-id", "Alice"));
    }

    #[tokio::test]
    async fn broken_session_lookup_falls_back_to_guest() {
        let resp = app_with(Arc::new(BrokenSessions), Arc::default(), SECRET)
            .oneshot(form_request("socket_id=1.2&channel_name=presence-audio", None))
            .await
            .unwrap();
        let (status, body) = read(resp).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["channel_data"].as_str().unwrap().contains("isGuest\":true"));
    }

    #[tokio::test]
    async fn auth_rejects_missing_fields_and_other_channels() {
        let resp = app(Arc::default())
            .oneshot(form_request("channel_name=presence-audio", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app(Arc::default())
            .oneshot(form_request("socket_id=1.2&channel_name=presence-other", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn auth_without_secret_fails() {
        let resp = app_with(sessions(), Arc::default(), "")
            .oneshot(form_request("socket_id=1.2&channel_name=presence-audio", None))
            .await
            .unwrap();
        let (status, body) = read(resp).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Auth failed");
    }

    #[tokio::test]
    async fn signal_is_published_for_authenticated_sender() {
        let publisher = Arc::new(RecordingPublisher::default());
        let envelope = serde_json::json!({
            "signal": {"type": "offer", "sdp": "v=0"},
            "to": "bob-id",
            "from": "alice-id"
        });
        let resp = app(publisher.clone())
            .oneshot(signal_request(envelope.clone(), Some("tok-alice")))
            .await
            .unwrap();
        let (status, body) = read(resp).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Signal sent");

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, CHANNEL);
        assert_eq!(published[0].1, "signal");
        assert_eq!(published[0].2, envelope);
    }

    #[tokio::test]
    async fn kick_is_relayed_verbatim() {
        let publisher = Arc::new(RecordingPublisher::default());
        let envelope = serde_json::json!({"signal": "kick", "to": "bob-id", "from": "alice-id"});
        let resp = app(publisher.clone())
            .oneshot(signal_request(envelope.clone(), Some("tok-alice")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(publisher.published.lock().unwrap()[0].2, envelope);
    }

    #[tokio::test]
    async fn unauthenticated_signal_is_rejected_before_publishing() {
        let publisher = Arc::new(RecordingPublisher::default());
        let resp = app(publisher.clone())
            .oneshot(signal_request(
                serde_json::json!({"signal": "kick", "to": "b", "from": "a"}),
                None,
            ))
            .await
            .unwrap();
        let (status, body) = read(resp).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broken_session_lookup_rejects_signal() {
        let resp = app_with(Arc::new(BrokenSessions), Arc::default(), SECRET)
            .oneshot(signal_request(
                serde_json::json!({"signal": "kick", "to": "b", "from": "a"}),
                Some("tok-alice"),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signal_with_missing_fields_is_rejected() {
        for body in [
            serde_json::json!({"to": "b", "from": "a"}),
            serde_json::json!({"signal": "", "to": "b", "from": "a"}),
            serde_json::json!({"signal": null, "to": "b", "from": "a"}),
            serde_json::json!({"signal": {"type": "answer"}, "from": "a"}),
            serde_json::json!({"signal": {"type": "answer"}, "to": "", "from": "a"}),
            serde_json::json!({"signal": {"type": "answer"}, "to": "b"}),
        ] {
            let publisher = Arc::new(RecordingPublisher::default());
            let resp = app(publisher.clone())
                .oneshot(signal_request(body.clone(), Some("tok-alice")))
                .await
                .unwrap();
            let (status, json) = read(resp).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json["message"], "Missing required fields");
            assert!(publisher.published.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn publish_failure_is_a_server_error() {
        let publisher = Arc::new(RecordingPublisher {
            fail: true,
            ..Default::default()
        });
        let resp = app(publisher)
            .oneshot(signal_request(
                serde_json::json!({"signal": {"candidate": "c"}, "to": "b", "from": "alice-id"}),
                Some("tok-alice"),
            ))
            .await
            .unwrap();
        let (status, body) = read(resp).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Signal failed");
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        let resp = app(Arc::default())
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/signal")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = app(Arc::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[test]
    fn presence_rules() {
        assert!(!is_present(&serde_json::json!(false)));
        assert!(!is_present(&serde_json::json!(0)));
        assert!(is_present(&serde_json::json!(true)));
        assert!(is_present(&serde_json::json!({})));
    }
}
