//! General and outbound-proxy configuration records
//!
//! Both records live behind one lock so an update is applied wholesale and
//! a reader never sees a mix of two updates.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// General runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub domain: String,
    /// Legacy address field, read-only through the API
    #[serde(rename = "ipv4")]
    pub old_ipv4: String,
    pub external_ipv4: String,
    pub bind_ipv4: String,
    pub unauth_url: String,
    pub https_port: u16,
    pub dns_port: u16,
    pub autocert: bool,
}

/// Fields of [`GeneralConfig`] the API may replace
///
/// Anything not listed here is ignored on decode. Listed fields that are
/// absent fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralConfigUpdate {
    pub domain: String,
    pub external_ipv4: String,
    pub bind_ipv4: String,
    pub unauth_url: String,
    pub https_port: u16,
    pub dns_port: u16,
    pub autocert: bool,
}

impl GeneralConfigUpdate {
    fn apply(self, cfg: &mut GeneralConfig) {
        cfg.domain = self.domain;
        cfg.external_ipv4 = self.external_ipv4;
        cfg.bind_ipv4 = self.bind_ipv4;
        cfg.unauth_url = self.unauth_url;
        cfg.https_port = self.https_port;
        cfg.dns_port = self.dns_port;
        cfg.autocert = self.autocert;
    }
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub enabled: bool,
}

/// Narrow contract the control plane depends on
pub trait SettingsStore: Send + Sync {
    fn general(&self) -> GeneralConfig;

    fn proxy(&self) -> ProxyConfig;

    /// Both records from the same instant
    fn snapshot(&self) -> (GeneralConfig, ProxyConfig);

    fn update_general(&self, update: GeneralConfigUpdate);

    fn set_proxy(&self, proxy: ProxyConfig);

    fn autocert_enabled(&self) -> bool {
        self.general().autocert
    }
}

#[derive(Debug, Default)]
struct Records {
    general: GeneralConfig,
    proxy: ProxyConfig,
}

/// In-memory settings holder
#[derive(Debug, Default)]
pub struct SettingsCell {
    records: RwLock<Records>,
}

impl SettingsCell {
    pub fn new(general: GeneralConfig, proxy: ProxyConfig) -> Self {
        Self {
            records: RwLock::new(Records { general, proxy }),
        }
    }
}

impl SettingsStore for SettingsCell {
    fn general(&self) -> GeneralConfig {
        self.records.read().general.clone()
    }

    fn proxy(&self) -> ProxyConfig {
        self.records.read().proxy.clone()
    }

    fn snapshot(&self) -> (GeneralConfig, ProxyConfig) {
        let records = self.records.read();
        (records.general.clone(), records.proxy.clone())
    }

    fn update_general(&self, update: GeneralConfigUpdate) {
        update.apply(&mut self.records.write().general);
    }

    fn set_proxy(&self, proxy: ProxyConfig) {
        self.records.write().proxy = proxy;
    }
}
