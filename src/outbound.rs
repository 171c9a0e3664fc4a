//! Outbound proxy switch
//!
//! The interception engine routes upstream traffic through an optional
//! proxy. The control plane only toggles it through [`ProxyEngine`].

use crate::settings::ProxyConfig;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

/// Proxy schemes the engine can dial
pub const SUPPORTED_PROXY_TYPES: &[&str] = &["http", "https", "socks5", "socks5h"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("unsupported proxy type: {0}")]
    UnsupportedType(String),

    #[error("proxy address is required when the proxy is enabled")]
    MissingAddress,
}

/// Narrow contract the control plane depends on
pub trait ProxyEngine: Send + Sync {
    /// Re-apply outbound proxy settings on the live engine
    fn set_proxy(&self, cfg: &ProxyConfig) -> Result<(), ProxyError>;
}

/// Outbound dialer address as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    pub url: String,
    pub username: Option<String>,
}

/// Engine-side state of the outbound proxy
#[derive(Debug, Default)]
pub struct OutboundProxy {
    route: RwLock<Option<ProxyRoute>>,
}

impl OutboundProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route currently used for upstream dials (`None` = direct)
    pub fn route(&self) -> Option<ProxyRoute> {
        self.route.read().clone()
    }
}

impl ProxyEngine for OutboundProxy {
    fn set_proxy(&self, cfg: &ProxyConfig) -> Result<(), ProxyError> {
        if !cfg.enabled {
            *self.route.write() = None;
            info!("Outbound proxy disabled");
            return Ok(());
        }

        let kind = cfg.kind.to_lowercase();
        if !SUPPORTED_PROXY_TYPES.contains(&kind.as_str()) {
            return Err(ProxyError::UnsupportedType(cfg.kind.clone()));
        }
        if cfg.address.is_empty() {
            return Err(ProxyError::MissingAddress);
        }

        let route = ProxyRoute {
            url: format!("{}://{}:{}", kind, cfg.address, cfg.port),
            username: (!cfg.username.is_empty()).then(|| cfg.username.clone()),
        };
        info!(url = %route.url, "Outbound proxy enabled");
        *self.route.write() = Some(route);
        Ok(())
    }
}
