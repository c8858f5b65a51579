//! Session providers: who is making this request?
//!
//! Authentication policy lives outside the relay. A provider only maps
//! request headers to an optional user.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Deserialize;
use tracing::debug;

use podcall_config::SessionEntry;

/// Authenticated user as reported by the session provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("session endpoint returned {0}")]
    Rejected(u16),

    #[error("malformed session response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `Ok(None)` means the request carries no session.
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<SessionUser>, SessionError>;
}

// ---------------------------------------------------------------------------
// Static tokens
// ---------------------------------------------------------------------------

/// Bearer tokens listed in `[[relay.sessions]]`.
pub struct TokenSessionProvider {
    tokens: HashMap<String, SessionUser>,
}

impl TokenSessionProvider {
    pub fn new(entries: &[SessionEntry]) -> Self {
        let tokens = entries
            .iter()
            .map(|e| {
                (
                    e.token.clone(),
                    SessionUser {
                        id: e.user_id.clone(),
                        name: e.name.clone(),
                    },
                )
            })
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl SessionProvider for TokenSessionProvider {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<SessionUser>, SessionError> {
        Ok(bearer_token(headers).and_then(|t| self.tokens.get(t).cloned()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// External session endpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    user: Option<RemoteUser>,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Option<String>,
    name: Option<String>,
}

/// Forwards the caller's cookies and authorization to an external session
/// endpoint that answers `{ "user": { "id", "name" } }` or `{}`.
pub struct RemoteSessionProvider {
    endpoint: String,
    http: reqwest::Client,
}

impl RemoteSessionProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SessionProvider for RemoteSessionProvider {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<SessionUser>, SessionError> {
        let cookie = headers.get(header::COOKIE);
        let authorization = headers.get(header::AUTHORIZATION);
        if cookie.is_none() && authorization.is_none() {
            return Ok(None);
        }

        let mut request = self.http.get(&self.endpoint);
        if let Some(value) = cookie {
            request = request.header(header::COOKIE, value.clone());
        }
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SessionError::Unreachable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Rejected(status.as_u16()));
        }

        let body: SessionResponse = response
            .json()
            .await
            .map_err(|e| SessionError::Malformed(e.to_string()))?;

        let user = body.user.and_then(|u| {
            let id = u.id.filter(|id| !id.is_empty())?;
            Some(SessionUser { id, name: u.name })
        });
        debug!(found = user.is_some(), "resolved remote session");
        Ok(user)
    }
}
