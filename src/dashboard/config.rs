//! Dashboard Configuration
//!
//! Listener, credential and timeout settings for the control-plane server.

use crate::certs::DEFAULT_CERT_WAIT;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Dashboard server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Bind address (default: 127.0.0.1)
    pub bind_addr: IpAddr,
    /// Port number (default: 8080)
    pub port: u16,
    /// Admin username for basic auth
    pub admin_username: String,
    /// Admin password for basic auth
    #[serde(skip_serializing)]
    pub admin_password: String,
    /// Per-request deadline
    pub request_timeout: Duration,
    /// Hard deadline for certificate provisioning (never above `request_timeout`)
    pub cert_wait: Duration,
    /// How long shutdown waits for in-flight requests
    pub shutdown_grace: Duration,
    /// Allowed CORS origins (empty = same-origin only)
    pub cors_origins: Vec<String>,
    /// Enable request logging
    pub log_requests: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            admin_username: "admin".to_string(),
            admin_password: random_password(),
            request_timeout: Duration::from_secs(75),
            cert_wait: DEFAULT_CERT_WAIT,
            shutdown_grace: Duration::from_secs(5),
            cors_origins: Vec::new(),
            log_requests: true,
        }
    }
}

impl DashboardConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ADMIN_BIND_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.bind_addr = parsed;
            }
        }

        if let Ok(port) = std::env::var("ADMIN_PORT") {
            if let Ok(parsed) = port.parse() {
                config.port = parsed;
            }
        }

        if let Ok(user) = std::env::var("ADMIN_USERNAME") {
            if !user.is_empty() {
                config.admin_username = user;
            }
        }

        match std::env::var("ADMIN_PASSWORD") {
            Ok(pass) if !pass.is_empty() => config.admin_password = pass,
            _ => tracing::warn!(
                "ADMIN_PASSWORD not set - generated password for '{}': {}",
                config.admin_username,
                config.admin_password
            ),
        }

        if let Some(secs) = env_secs("ADMIN_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = secs;
        }

        if let Some(secs) = env_secs("ADMIN_CERT_WAIT_SECS") {
            config.cert_wait = secs;
        }

        if let Some(secs) = env_secs("ADMIN_SHUTDOWN_GRACE_SECS") {
            config.shutdown_grace = secs;
        }

        if let Ok(origins) = std::env::var("ADMIN_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Ok(val) = std::env::var("ADMIN_LOG_REQUESTS") {
            config.log_requests = val == "true" || val == "1";
        }

        config.normalized()
    }

    /// Clamp the certificate deadline to the request timeout
    pub fn normalized(mut self) -> Self {
        if self.cert_wait > self.request_timeout {
            tracing::warn!(
                "Certificate wait {}s exceeds request timeout {}s - clamping",
                self.cert_wait.as_secs(),
                self.request_timeout.as_secs()
            );
            self.cert_wait = self.request_timeout;
        }
        self
    }

    /// Check if bound to localhost only
    pub fn is_localhost(&self) -> bool {
        self.bind_addr.is_loopback()
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.socket_addr())
    }

    /// Loopback config with fixed credentials and an ephemeral port
    pub fn local(username: &str, password: &str) -> Self {
        Self {
            port: 0,
            admin_username: username.to_string(),
            admin_password: password.to_string(),
            log_requests: false,
            ..Default::default()
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_localhost() {
        let config = DashboardConfig::default();
        assert!(config.is_localhost());
        assert_eq!(config.port, 8080);
        assert_eq!(config.admin_password.len(), 24);
    }

    #[test]
    fn test_cert_wait_clamped() {
        let config = DashboardConfig {
            request_timeout: Duration::from_secs(30),
            cert_wait: Duration::from_secs(60),
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.cert_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_default_cert_wait_within_request_timeout() {
        let config = DashboardConfig::default();
        assert!(config.cert_wait <= config.request_timeout);
    }

    #[test]
    fn test_base_url() {
        let config = DashboardConfig::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_password_not_serialized() {
        let config = DashboardConfig::local("admin", "hunter2");
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("admin_password").is_none());
    }
}
