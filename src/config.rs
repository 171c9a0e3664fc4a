//! Process configuration

use anyhow::Result;
use std::path::PathBuf;

/// Collaborator wiring configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// TOML seed with sites, lures and general/proxy config (optional)
    pub state_file: Option<PathBuf>,

    /// JSON session database
    pub sessions_file: PathBuf,

    /// Line-per-address blacklist file (optional, memory-only when unset)
    pub blacklist_file: Option<PathBuf>,

    /// External certificate provisioning command (optional)
    pub cert_hook: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let state_file = std::env::var("PROXY_ADMIN_STATE_FILE")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let sessions_file = std::env::var("PROXY_ADMIN_SESSIONS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir().join("sessions.json"));

        let blacklist_file = std::env::var("PROXY_ADMIN_BLACKLIST_FILE")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let cert_hook = std::env::var("PROXY_ADMIN_CERT_HOOK")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            state_file,
            sessions_file,
            blacklist_file,
            cert_hook,
        })
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("proxy-admin")
}
