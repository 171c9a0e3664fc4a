//! Control Plane Integration Tests
//!
//! Drives the full router (auth gate included) over collaborators seeded
//! from a TOML state file and file-backed stores.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use proxy_admin::certs::{CertError, CertProvisioner};
use proxy_admin::dashboard::basic_header;
use proxy_admin::{
    ApiState, BlacklistStore, CertCoordinator, DashboardConfig, DashboardServer, IpBlacklist,
    LureStore, OutboundProxy, SessionDb, SessionStore, SettingsStore, StateFile,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_ok;
use tower::ServiceExt;

const SEED: &str = r#"
[general]
domain = "example.org"
external_ipv4 = "203.0.113.10"
https_port = 443
dns_port = 53

[[sites]]
name = "corp"
landing = "login"
hosts = ["login", "www"]
hostname = "corp.example.org"

[[sites]]
name = "base"
template = true
"#;

#[derive(Default)]
struct CountingIssuer {
    calls: AtomicUsize,
}

#[async_trait]
impl CertProvisioner for CountingIssuer {
    async fn ensure_managed(&self, _hosts: &[String], _wait: Duration) -> Result<(), CertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    router: Router,
    sessions: Arc<SessionDb>,
    blacklist: Arc<IpBlacklist>,
    lures: Arc<proxy_admin::LureList>,
    settings: Arc<proxy_admin::SettingsCell>,
    issuer: Arc<CountingIssuer>,
    dir: TempDir,
}

fn harness() -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let seed = StateFile::parse(SEED).expect("Failed to parse seed");

    let sessions = Arc::new(SessionDb::open(dir.path().join("sessions.json")).unwrap());
    for i in 0..3 {
        sessions.create("corp", "https://login.corp.example.org/", "curl", &format!("10.0.0.{}", i));
    }
    sessions.flush().unwrap();

    let blacklist = Arc::new(IpBlacklist::open(dir.path().join("blacklist.txt")).unwrap());
    let lures = Arc::new(seed.lure_list());
    let settings = Arc::new(seed.settings());
    let issuer = Arc::new(CountingIssuer::default());

    let state = ApiState::new(
        Arc::new(seed.site_table()),
        lures.clone(),
        sessions.clone(),
        blacklist.clone(),
        settings.clone(),
        Arc::new(OutboundProxy::new()),
        Arc::new(CertCoordinator::new(issuer.clone(), Duration::from_secs(5))),
    );
    let router = DashboardServer::new(DashboardConfig::local("admin", "hunter2"), state).build_router();

    Harness {
        router,
        sessions,
        blacklist,
        lures,
        settings,
        issuer,
        dir,
    }
}

impl Harness {
    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, body, Some(("admin", "hunter2"))).await
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        creds: Option<(&str, &str)>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some((user, pass)) = creds {
            builder = builder.header(header::AUTHORIZATION, basic_header(user, pass));
        }
        let body = body.map(|v| Body::from(v.to_string())).unwrap_or_else(Body::empty);

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

#[tokio::test]
async fn test_wrong_credentials_have_no_side_effects() {
    let h = harness();

    let (status, _) = h
        .send("POST", "/api/blacklist", Some(json!({"ip": "1.2.3.4", "action": "add"})), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h
        .send(
            "POST",
            "/api/lures",
            Some(json!({"phishlet": "corp"})),
            Some(("admin", "wrong")),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h
        .send("DELETE", "/api/sessions/1", None, Some(("root", "hunter2")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(h.blacklist.is_empty());
    assert_eq!(h.lures.len(), 0);
    assert_eq!(h.sessions.list().unwrap().len(), 3);
}

#[tokio::test]
async fn test_status_reflects_seed() {
    let h = harness();
    let (status, json) = h.call("GET", "/api/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active_phishlets"], 0);
    assert_eq!(json["sessions_count"], 3);
    assert_eq!(json["lures_count"], 0);
    assert_eq!(json["blacklist_count"], 0);
    assert_eq!(json["domain"], "example.org");
    assert_eq!(json["external_ip"], "203.0.113.10");
    assert_eq!(json["recent_sessions"][0]["id"], 3);
}

#[tokio::test]
async fn test_blacklist_add_remove_persists() {
    let h = harness();

    for _ in 0..2 {
        let (status, json) = h
            .call("POST", "/api/blacklist", Some(json!({"ip": "1.2.3.4", "action": "add"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "added");
    }

    let (_, json) = h.call("GET", "/api/blacklist", None).await;
    assert_eq!(json["blacklist"], json!([{"ip": "1.2.3.4"}]));

    let on_disk = std::fs::read_to_string(h.dir.path().join("blacklist.txt")).unwrap();
    assert_eq!(on_disk.trim(), "1.2.3.4");

    let (status, json) = h
        .call("POST", "/api/blacklist", Some(json!({"ip": "1.2.3.4", "action": "remove"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "removed");

    let (_, json) = h.call("GET", "/api/status", None).await;
    assert_eq!(json["blacklist_count"], 0);

    let (status, json) = h
        .call("POST", "/api/blacklist", Some(json!({"ip": "not-an-ip", "action": "add"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("invalid IP address"));
    assert!(h.blacklist.is_empty());
}

#[tokio::test]
async fn test_blacklist_write_failure_keeps_list_unchanged() {
    let h = harness();
    std::fs::remove_dir_all(h.dir.path()).unwrap();

    let (status, json) = h
        .call("POST", "/api/blacklist", Some(json!({"ip": "1.2.3.4", "action": "add"})))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().starts_with("blacklist I/O error"));

    let (_, json) = h.call("GET", "/api/blacklist", None).await;
    assert_eq!(json["blacklist"], json!([]));
    assert!(!h.blacklist.contains("1.2.3.4"));
}

#[tokio::test]
async fn test_enable_then_lures_resolve() {
    let h = harness();

    let (status, _) = h.call("POST", "/api/phishlets/corp/enable", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = h.call("POST", "/api/phishlets/base/enable", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("template"));

    for _ in 0..3 {
        let (status, json) = h.call("POST", "/api/lures", Some(json!({"phishlet": "corp"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "created");
    }

    let (_, json) = h.call("GET", "/api/lures", None).await;
    let lures = json["lures"].as_array().unwrap();
    assert_eq!(lures.len(), 3);
    for (i, lure) in lures.iter().enumerate() {
        assert_eq!(lure["id"], i);
        assert!(lure["url"]
            .as_str()
            .unwrap()
            .starts_with("https://login.corp.example.org/"));
    }

    let (_, json) = h.call("GET", "/api/status", None).await;
    assert_eq!(json["active_phishlets"], 1);
    assert_eq!(json["lures_count"], 3);
}

#[tokio::test]
async fn test_unknown_lure_site_not_found() {
    let h = harness();
    let (status, json) = h.call("POST", "/api/lures", Some(json!({"phishlet": "ghost"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Phishlet not found");
    assert_eq!(h.lures.len(), 0);
}

#[tokio::test]
async fn test_config_round_trip() {
    let h = harness();
    let (status, _) = h
        .call(
            "POST",
            "/api/config",
            Some(json!({"domain": "fresh.example", "https_port": 8443, "ipv4": "192.0.2.9"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = h.call("GET", "/api/config", None).await;
    assert_eq!(json["config"]["domain"], "fresh.example");
    assert_eq!(json["config"]["https_port"], 8443);
    assert_eq!(json["config"]["ipv4"], "");
    assert_eq!(h.settings.general().domain, "fresh.example");
}

#[tokio::test]
async fn test_session_delete_flushes_store() {
    let h = harness();

    let (status, json) = h.call("GET", "/api/sessions/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["remote_ip"], "10.0.0.1");

    let (status, json) = h.call("DELETE", "/api/sessions/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "deleted");

    let (status, _) = h.call("GET", "/api/sessions/2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let reopened = SessionDb::open(h.dir.path().join("sessions.json")).unwrap();
    let ids: Vec<u64> = reopened.list().unwrap().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_test_certs_after_enable() {
    let h = harness();
    let (status, _) = h.call("POST", "/api/test-certs", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    h.call("POST", "/api/phishlets/corp/enable", None).await;
    let (status, json) = h.call("POST", "/api/test-certs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Certificates tested and setup successfully.");
    assert_eq!(h.issuer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_serves_over_tcp() {
    let dir = TempDir::new().unwrap();
    let seed = StateFile::parse(SEED).unwrap();
    let state = ApiState::new(
        Arc::new(seed.site_table()),
        Arc::new(seed.lure_list()),
        Arc::new(SessionDb::open(dir.path().join("sessions.json")).unwrap()),
        Arc::new(IpBlacklist::new()),
        Arc::new(seed.settings()),
        Arc::new(OutboundProxy::new()),
        Arc::new(CertCoordinator::new(
            Arc::new(CountingIssuer::default()),
            Duration::from_secs(5),
        )),
    );

    let handle = assert_ok!(
        DashboardServer::new(DashboardConfig::local("admin", "hunter2"), state)
            .start()
            .await
    );
    let addr = handle.local_addr();

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /api/status HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        addr
    );
    tokio::io::AsyncWriteExt::write_all(&mut stream, request.as_bytes())
        .await
        .unwrap();
    let mut raw = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut raw).await.unwrap();
    let reply = String::from_utf8_lossy(&raw);
    assert!(reply.starts_with("HTTP/1.1 401"));
    assert!(reply.contains("Basic realm=\"Restricted\""));

    let stopped = tokio::time::timeout(Duration::from_secs(10), handle.stop()).await;
    let stopped = assert_ok!(stopped);
    assert_ok!(stopped);
}
