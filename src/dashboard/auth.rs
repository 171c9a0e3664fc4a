//! Dashboard Authentication
//!
//! HTTP basic authentication against a single configured admin credential
//! pair. Every request re-authenticates; no session or cookie is issued.
//!
//! A missing header, a malformed header and wrong credentials all produce
//! the same `401` with a `WWW-Authenticate` challenge, and the downstream
//! handler never runs.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Challenge sent with every rejection
pub const CHALLENGE: &str = r#"Basic realm="Restricted""#;

/// Admin credential pair
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Constant-time check of a decoded pair
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = self.username.as_bytes().ct_eq(username.as_bytes());
        let pass_ok = self.password.as_bytes().ct_eq(password.as_bytes());
        (user_ok & pass_ok).into()
    }

    /// Check an `Authorization` header set
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        match parse_basic(headers) {
            Some((user, pass)) => self.verify(&user, &pass),
            None => false,
        }
    }
}

/// Decode `Authorization: Basic <base64(user:pass)>`
pub fn parse_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Build a `Basic` header value, mainly for clients and tests
pub fn basic_header(username: &str, password: &str) -> String {
    let token =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", token)
}

/// Rejection response
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE))],
        "Unauthorized\n",
    )
        .into_response()
}

/// Authentication middleware
pub async fn basic_auth_middleware(
    State(auth): State<Arc<BasicAuth>>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.authorize(req.headers()) {
        debug!(path = %req.uri().path(), "Rejected unauthenticated request");
        return unauthorized();
    }
    next.run(req).await
}
