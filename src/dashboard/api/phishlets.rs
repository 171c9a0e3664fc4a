//! Phishlet binding API
//!
//! Listing and enable/disable of site bindings. Enabling with autocert on
//! provisions certificates for every active hostname, but a provisioning
//! failure never undoes the enable.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use tracing::{error, info};

use super::{ActionResponse, ApiError, ApiState};
use crate::sites::SiteError;

#[derive(Debug, Serialize)]
pub struct PhishletInfo {
    pub name: String,
    pub enabled: bool,
    pub hostname: String,
}

#[derive(Debug, Serialize)]
pub struct PhishletListResponse {
    pub phishlets: Vec<PhishletInfo>,
}

/// List every resolvable site binding
pub async fn list_phishlets(State(state): State<ApiState>) -> Json<PhishletListResponse> {
    let phishlets = state
        .sites
        .names()
        .into_iter()
        .filter(|name| state.sites.definition(name).is_ok())
        .map(|name| PhishletInfo {
            enabled: state.sites.is_enabled(&name),
            hostname: state.sites.hostname(&name),
            name,
        })
        .collect();

    Json(PhishletListResponse { phishlets })
}

pub async fn enable_phishlet(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let definition = state
        .sites
        .definition(&name)
        .map_err(|_| ApiError::NotFound("Phishlet not found".into()))?;

    if definition.template {
        return Err(ApiError::BadRequest(
            "Cannot enable a template phishlet directly. Create a child phishlet first.".into(),
        ));
    }

    if state.sites.hostname(&name).is_empty() {
        return Err(ApiError::BadRequest(
            "Hostname must be set before enabling the phishlet.".into(),
        ));
    }

    if let Err(e) = state.sites.set_enabled(&name) {
        let _ = state.sites.set_disabled(&name);
        return Err(match e {
            SiteError::HostnameUnset(_) => ApiError::BadRequest(
                "Hostname must be set before enabling the phishlet.".into(),
            ),
            other => ApiError::Internal(other.to_string()),
        });
    }
    info!(phishlet = %name, "Phishlet enabled");

    if state.settings.autocert_enabled() {
        let hosts = state.sites.active_hostnames();
        if let Err(e) = state.certs.provision(hosts).await {
            error!(phishlet = %name, "Failed to set up TLS certificates: {}", e);
        }
    }

    Ok(ActionResponse::new("enabled"))
}

pub async fn disable_phishlet(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    state
        .sites
        .set_disabled(&name)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(phishlet = %name, "Phishlet disabled");

    Ok(ActionResponse::new("disabled"))
}
