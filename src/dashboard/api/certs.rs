//! Certificate test API

use axum::{extract::State, response::Json};
use tracing::error;

use super::{ActionResponse, ApiError, ApiState};

/// Provision certificates for every active hostname and report the outcome
pub async fn test_certs(State(state): State<ApiState>) -> Result<Json<ActionResponse>, ApiError> {
    let hosts = state.sites.active_hostnames();
    if hosts.is_empty() {
        return Err(ApiError::BadRequest(
            "No active phishlets with hostnames found.".into(),
        ));
    }

    if let Err(e) = state.certs.provision(hosts).await {
        error!("Failed to set up TLS certificates: {}", e);
        return Err(ApiError::Internal(format!("Certificate setup failed: {}", e)));
    }

    Ok(Json(ActionResponse {
        status: "ok",
        path: None,
        message: Some("Certificates tested and setup successfully."),
    }))
}
