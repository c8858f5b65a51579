//! Relay error type that implements Axum's `IntoResponse`.
//!
//! Every error is returned as `{"message": ...}` with the matching status;
//! internal details stay in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::publisher::PublishError;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("missing required fields")]
    MissingFields,

    #[error("channel not allowed: {0}")]
    ForbiddenChannel(String),

    #[error("relay misconfigured: {0}")]
    Misconfigured(String),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::MissingFields => StatusCode::BAD_REQUEST,
            RelayError::ForbiddenChannel(_) => StatusCode::FORBIDDEN,
            RelayError::Misconfigured(_) | RelayError::Publish(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            RelayError::Unauthorized => "Unauthorized",
            RelayError::MissingFields => "Missing required fields",
            RelayError::ForbiddenChannel(_) => "Forbidden",
            RelayError::Misconfigured(_) => "Auth failed",
            RelayError::Publish(_) => "Signal failed",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = serde_json::json!({ "message": self.public_message() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body(resp: Response) -> (StatusCode, serde_json::Value) {
        let status = resp.status();
        let bytes = Body::new(resp.into_body())
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn unauthorized_is_401() {
        let (status, body) = read_body(RelayError::Unauthorized.into_response()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn misconfiguration_hides_detail() {
        let err = RelayError::Misconfigured("secret is not set".into());
        let (status, body) = read_body(err.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Auth failed");
    }

    #[tokio::test]
    async fn publish_failure_is_500() {
        let err = RelayError::from(PublishError::Network("connection reset".into()));
        let (status, body) = read_body(err.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Signal failed");
    }

    #[test]
    fn statuses() {
        assert_eq!(RelayError::MissingFields.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::ForbiddenChannel("x".into()).status(),
            StatusCode::FORBIDDEN
        );
    }
}
