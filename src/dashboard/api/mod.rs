//! Control-plane API Endpoints
//!
//! JSON handlers over the collaborator contracts. Every handler answers
//! either with its payload or with an `{"error": "<message>"}` envelope.

pub mod blacklist;
pub mod certs;
pub mod config;
pub mod lures;
pub mod phishlets;
pub mod sessions;
pub mod status;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::blacklist::BlacklistStore;
use crate::certs::CertCoordinator;
use crate::lures::LureStore;
use crate::outbound::ProxyEngine;
use crate::sessions::SessionStore;
use crate::settings::SettingsStore;
use crate::sites::SiteStore;

pub use blacklist::{BlacklistAction, BlacklistEntry, BlacklistResponse};
pub use config::ConfigResponse;
pub use lures::{CreateLureRequest, LureInfo, LureListResponse};
pub use phishlets::{PhishletInfo, PhishletListResponse};
pub use sessions::{SessionDetail, SessionId, SessionListResponse, SessionSummary, TokenFlags};
pub use status::{RecentSession, StatusResponse, RECENT_SESSIONS};

/// Handles to every collaborator the handlers touch
#[derive(Clone)]
pub struct ApiState {
    pub sites: Arc<dyn SiteStore>,
    pub lures: Arc<dyn LureStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub blacklist: Arc<dyn BlacklistStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub proxy: Arc<dyn ProxyEngine>,
    pub certs: Arc<CertCoordinator>,
    /// Keeps engine and stored proxy config updated as one step
    proxy_update: Arc<Mutex<()>>,
}

impl ApiState {
    pub fn new(
        sites: Arc<dyn SiteStore>,
        lures: Arc<dyn LureStore>,
        sessions: Arc<dyn SessionStore>,
        blacklist: Arc<dyn BlacklistStore>,
        settings: Arc<dyn SettingsStore>,
        proxy: Arc<dyn ProxyEngine>,
        certs: Arc<CertCoordinator>,
    ) -> Self {
        Self {
            sites,
            lures,
            sessions,
            blacklist,
            settings,
            proxy,
            certs,
            proxy_update: Arc::new(Mutex::new(())),
        }
    }
}

/// Request-level failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Success envelope for mutating endpoints
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl ActionResponse {
    pub fn new(status: &'static str) -> Json<Self> {
        Json(Self {
            status,
            path: None,
            message: None,
        })
    }
}

/// JSON body extractor whose every failure is a `400` in the error envelope
///
/// The content type is not checked.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

/// Create the API router
///
/// Routes (all relative to the `/api` mount point):
/// - GET /status
/// - GET /phishlets, POST /phishlets/{name}/enable, POST /phishlets/{name}/disable
/// - GET /sessions, GET|DELETE /sessions/{id}
/// - GET|POST /lures
/// - GET|POST /blacklist
/// - GET|POST /config, POST /proxy
/// - POST /test-certs
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(status::status_handler))
        .route("/phishlets", get(phishlets::list_phishlets))
        .route("/phishlets/{name}/enable", post(phishlets::enable_phishlet))
        .route("/phishlets/{name}/disable", post(phishlets::disable_phishlet))
        .route("/sessions", get(sessions::list_sessions))
        .route(
            "/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/lures", get(lures::list_lures).post(lures::create_lure))
        .route(
            "/blacklist",
            get(blacklist::list_blacklist).post(blacklist::blacklist_action),
        )
        .route("/config", get(config::get_config).post(config::update_config))
        .route("/proxy", post(config::update_proxy))
        .route("/test-certs", post(certs::test_certs))
        .with_state(state)
}
