//! Blacklist API

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ActionResponse, ApiError, ApiState, JsonBody};
use crate::blacklist::BlacklistError;

#[derive(Debug, Serialize)]
pub struct BlacklistEntry {
    pub ip: String,
}

#[derive(Debug, Serialize)]
pub struct BlacklistResponse {
    pub blacklist: Vec<BlacklistEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlacklistAction {
    pub ip: String,
    /// `add` or `remove`
    pub action: String,
}

pub async fn list_blacklist(State(state): State<ApiState>) -> Json<BlacklistResponse> {
    let blacklist = state
        .blacklist
        .ips()
        .into_iter()
        .map(|ip| BlacklistEntry { ip })
        .collect();
    Json(BlacklistResponse { blacklist })
}

pub async fn blacklist_action(
    State(state): State<ApiState>,
    JsonBody(req): JsonBody<BlacklistAction>,
) -> Result<Json<ActionResponse>, ApiError> {
    let adding = match req.action.as_str() {
        "add" => true,
        "remove" => false,
        _ => return Err(ApiError::BadRequest("Invalid action".into())),
    };

    // The store rewrites its backing file under its lock
    let blacklist = state.blacklist.clone();
    let ip = req.ip.clone();
    tokio::task::spawn_blocking(move || {
        if adding {
            blacklist.add(&ip)
        } else {
            blacklist.remove(&ip)
        }
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .map_err(map_err)?;

    let status = if adding { "added" } else { "removed" };
    info!(ip = %req.ip, "Blacklist entry {}", status);

    Ok(ActionResponse::new(status))
}

fn map_err(e: BlacklistError) -> ApiError {
    match e {
        BlacklistError::InvalidIp(_) => ApiError::BadRequest(e.to_string()),
        BlacklistError::Io(_) => ApiError::Internal(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use crate::blacklist::BlacklistStore;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_then_list() {
        let fx = Fixture::new();
        let (status, json) = fx
            .call("POST", "/blacklist", Some(json!({"ip": "1.2.3.4", "action": "add"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "added");

        let (_, json) = fx.call("GET", "/blacklist", None).await;
        assert_eq!(json["blacklist"], json!([{"ip": "1.2.3.4"}]));
    }

    #[tokio::test]
    async fn test_idempotent_add_and_remove() {
        let fx = Fixture::new();
        let add = json!({"ip": "1.2.3.4", "action": "add"});
        fx.call("POST", "/blacklist", Some(add.clone())).await;
        fx.call("POST", "/blacklist", Some(add)).await;
        assert_eq!(fx.blacklist.len(), 1);

        let (status, json) = fx
            .call("POST", "/blacklist", Some(json!({"ip": "9.9.9.9", "action": "remove"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "removed");
        assert_eq!(fx.blacklist.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_action() {
        let fx = Fixture::new();
        let (status, json) = fx
            .call("POST", "/blacklist", Some(json!({"ip": "1.2.3.4", "action": "ban"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid action");
        assert!(fx.blacklist.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_ip() {
        let fx = Fixture::new();
        let (status, _) = fx
            .call("POST", "/blacklist", Some(json!({"ip": "example.org", "action": "add"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(fx.blacklist.is_empty());
    }
}
