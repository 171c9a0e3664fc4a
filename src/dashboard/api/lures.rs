//! Lures API

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ActionResponse, ApiError, ApiState, JsonBody};
use crate::lures::Lure;

#[derive(Debug, Serialize)]
pub struct LureInfo {
    /// Position in the collection when listed
    pub id: usize,
    pub phishlet: String,
    pub path: String,
    /// Full URL, or `Error: ...` when it cannot be resolved
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct LureListResponse {
    pub lures: Vec<LureInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateLureRequest {
    pub phishlet: String,
}

/// List lures with their resolved URLs
///
/// Lures whose site no longer resolves are left out; URL resolution
/// failures are reported inline.
pub async fn list_lures(State(state): State<ApiState>) -> Json<LureListResponse> {
    let lures = state
        .lures
        .list()
        .into_iter()
        .enumerate()
        .filter(|(_, lure)| state.sites.definition(&lure.phishlet).is_ok())
        .map(|(id, lure)| {
            let url = if !lure.hostname.is_empty() {
                format!("https://{}{}", lure.hostname, lure.path)
            } else {
                state
                    .sites
                    .lure_url(&lure.phishlet, &lure.path)
                    .unwrap_or_else(|e| format!("Error: {}", e))
            };
            LureInfo {
                id,
                phishlet: lure.phishlet,
                path: lure.path,
                url,
            }
        })
        .collect();

    Json(LureListResponse { lures })
}

pub async fn create_lure(
    State(state): State<ApiState>,
    JsonBody(req): JsonBody<CreateLureRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    state
        .sites
        .definition(&req.phishlet)
        .map_err(|_| ApiError::NotFound("Phishlet not found".into()))?;

    let lure = Lure::generate(req.phishlet);
    let path = lure.path.clone();
    info!(phishlet = %lure.phishlet, path = %path, "Lure created");
    state.lures.add(lure);

    Ok(Json(ActionResponse {
        status: "created",
        path: Some(path),
        message: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use crate::lures::{Lure, LureStore};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_list() {
        let fx = Fixture::new();
        fx.sites.set_hostname("corp", "corp.test").unwrap();

        let (status, json) = fx.call("POST", "/lures", Some(json!({"phishlet": "corp"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "created");
        let path = json["path"].as_str().unwrap().to_string();
        assert_eq!(path.len(), 9);
        assert!(path.starts_with('/'));
        assert!(path[1..].chars().all(|c| c.is_ascii_alphanumeric()));

        let (_, json) = fx.call("GET", "/lures", None).await;
        let lures = json["lures"].as_array().unwrap();
        assert_eq!(lures.len(), 1);
        assert_eq!(lures[0]["id"], 0);
        assert_eq!(lures[0]["phishlet"], "corp");
        assert_eq!(lures[0]["url"], format!("https://login.corp.test{}", path));
    }

    #[tokio::test]
    async fn test_create_unknown_site() {
        let fx = Fixture::new();
        let (status, json) = fx
            .call("POST", "/lures", Some(json!({"phishlet": "unknown-site"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!json["error"].as_str().unwrap().is_empty());
        assert!(fx.lures.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_creates_all_listed() {
        let fx = Fixture::new();
        for _ in 0..10 {
            let (status, _) = fx.call("POST", "/lures", Some(json!({"phishlet": "corp"}))).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (_, json) = fx.call("GET", "/lures", None).await;
        assert_eq!(json["lures"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_url_resolution_variants() {
        let fx = Fixture::new();
        fx.lures.add(Lure {
            path: "/override".into(),
            phishlet: "corp".into(),
            hostname: "promo.test".into(),
        });
        // corp has no hostname yet
        fx.lures.add(Lure {
            path: "/nohost".into(),
            phishlet: "corp".into(),
            hostname: String::new(),
        });
        fx.lures.add(Lure {
            path: "/gone".into(),
            phishlet: "deleted-site".into(),
            hostname: String::new(),
        });

        let (status, json) = fx.call("GET", "/lures", None).await;
        assert_eq!(status, StatusCode::OK);
        let lures = json["lures"].as_array().unwrap();
        assert_eq!(lures.len(), 2);
        assert_eq!(lures[0]["url"], "https://promo.test/override");
        assert!(lures[1]["url"].as_str().unwrap().starts_with("Error: "));
    }
}
