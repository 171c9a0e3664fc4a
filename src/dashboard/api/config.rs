//! Configuration API
//!
//! - `GET /api/config` - General and proxy records as stored
//! - `POST /api/config` - Replace the allow-listed general fields
//! - `POST /api/proxy` - Apply proxy settings to the engine, then store them
//!
//! Listening ports and the bind address only take effect after a restart;
//! the API applies them to the stored record and tells the operator.

use axum::{extract::State, response::Json};
use serde::Serialize;
use tracing::warn;

use super::{ActionResponse, ApiError, ApiState, JsonBody};
use crate::settings::{GeneralConfig, GeneralConfigUpdate, ProxyConfig};

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config: GeneralConfig,
    pub proxy: ProxyConfig,
}

pub async fn get_config(State(state): State<ApiState>) -> Json<ConfigResponse> {
    let (config, proxy) = state.settings.snapshot();
    Json(ConfigResponse { config, proxy })
}

pub async fn update_config(
    State(state): State<ApiState>,
    JsonBody(update): JsonBody<GeneralConfigUpdate>,
) -> Result<Json<ActionResponse>, ApiError> {
    state.settings.update_general(update);
    warn!("General configuration updated via control plane. Restart required for some changes to take effect.");

    Ok(ActionResponse::new("updated"))
}

pub async fn update_proxy(
    State(state): State<ApiState>,
    JsonBody(proxy): JsonBody<ProxyConfig>,
) -> Result<Json<ActionResponse>, ApiError> {
    {
        let _guard = state.proxy_update.lock();
        state
            .proxy
            .set_proxy(&proxy)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        state.settings.set_proxy(proxy);
    }
    warn!("Proxy settings updated via control plane. Restart required for full effect.");

    Ok(ActionResponse::new("updated"))
}
