//! Status API
//!
//! Aggregate counters for the dashboard landing view.

use axum::{extract::State, response::Json};
use serde::Serialize;

use super::{ApiError, ApiState};

/// How many sessions the status view lists
pub const RECENT_SESSIONS: usize = 5;

/// Session row in the status view
#[derive(Debug, Serialize)]
pub struct RecentSession {
    pub id: u64,
    pub phishlet: String,
    pub username: String,
    /// Last update (Unix seconds)
    pub time: i64,
}

/// System status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Number of enabled site bindings
    pub active_phishlets: usize,
    pub sessions_count: usize,
    pub lures_count: usize,
    pub blacklist_count: usize,
    pub domain: String,
    pub external_ip: String,
    /// Latest insertions first. Insertion order, not timestamps, decides recency.
    pub recent_sessions: Vec<RecentSession>,
}

/// Status handler
pub async fn status_handler(
    State(state): State<ApiState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let active_phishlets = state
        .sites
        .names()
        .iter()
        .filter(|name| state.sites.is_enabled(name))
        .count();

    let sessions = state
        .sessions
        .list()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let recent_sessions = sessions
        .iter()
        .rev()
        .take(RECENT_SESSIONS)
        .map(|s| RecentSession {
            id: s.id,
            phishlet: s.phishlet.clone(),
            username: s.username.clone(),
            time: s.update_time,
        })
        .collect();

    let general = state.settings.general();

    Ok(Json(StatusResponse {
        active_phishlets,
        sessions_count: sessions.len(),
        lures_count: state.lures.len(),
        blacklist_count: state.blacklist.len(),
        domain: general.domain,
        external_ip: general.external_ipv4,
        recent_sessions,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{BrokenSessions, Fixture};
    use crate::blacklist::BlacklistStore;
    use crate::sites::SiteStore;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_empty_status() {
        let fx = Fixture::new();
        let (status, json) = fx.call("GET", "/status", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sessions_count"], 0);
        assert_eq!(json["lures_count"], 0);
        assert_eq!(json["blacklist_count"], 0);
        assert_eq!(json["active_phishlets"], 0);
        assert_eq!(json["recent_sessions"], serde_json::json!([]));
        assert_eq!(json["domain"], "example.org");
        assert_eq!(json["external_ip"], "203.0.113.10");
    }

    #[tokio::test]
    async fn test_recent_sessions_by_insertion_order() {
        let fx = Fixture::new();
        for i in 0..7 {
            let id = fx.sessions.create("corp", "", "", "");
            fx.sessions
                .update(id, |s| s.username = format!("user{}", i))
                .unwrap();
        }
        fx.sites.set_hostname("corp", "corp.test").unwrap();
        fx.sites.set_enabled("corp").unwrap();
        fx.blacklist.add("10.0.0.1").unwrap();

        let (_, json) = fx.call("GET", "/status", None).await;
        assert_eq!(json["sessions_count"], 7);
        assert_eq!(json["active_phishlets"], 1);
        assert_eq!(json["blacklist_count"], 1);

        let ids: Vec<u64> = json["recent_sessions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![7, 6, 5, 4, 3]);
        assert_eq!(json["recent_sessions"][0]["username"], "user6");
    }

    #[tokio::test]
    async fn test_session_store_failure_not_reported_as_empty() {
        let mut fx = Fixture::new();
        fx.state.sessions = std::sync::Arc::new(BrokenSessions);

        let (status, json) = fx.call("GET", "/status", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json.get("sessions_count").is_none());
    }
}
