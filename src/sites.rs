//! Site definitions and bindings
//!
//! A site definition describes how a target service is proxied (its host
//! subdomains and landing host). A binding attaches a hostname and an
//! enabled flag to a definition. Template definitions are abstract and can
//! never be enabled themselves.
//!
//! The control plane talks to this collaborator only through [`SiteStore`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Site store errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SiteError {
    #[error("phishlet '{0}' not found")]
    NotFound(String),

    #[error("phishlet '{0}' is a template and cannot be enabled")]
    Template(String),

    #[error("hostname for phishlet '{0}' is not set")]
    HostnameUnset(String),

    #[error("phishlet '{0}' has no landing host defined")]
    NoLandingHost(String),
}

/// Reusable definition of a proxied service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDefinition {
    pub name: String,
    /// Abstract base that only derived definitions can be enabled from
    #[serde(default)]
    pub template: bool,
    /// Subdomain visitors land on (empty string = bare hostname)
    #[serde(default)]
    pub landing: Option<String>,
    /// Subdomains proxied for this site
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl SiteDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: false,
            landing: None,
            hosts: Vec::new(),
        }
    }

    pub fn template(mut self) -> Self {
        self.template = true;
        self
    }

    pub fn with_landing(mut self, sub: impl Into<String>) -> Self {
        let sub = sub.into();
        if !self.hosts.contains(&sub) {
            self.hosts.push(sub.clone());
        }
        self.landing = Some(sub);
        self
    }

    pub fn with_host(mut self, sub: impl Into<String>) -> Self {
        self.hosts.push(sub.into());
        self
    }

    /// Full URL for a lure path under this definition bound to `hostname`
    pub fn lure_url(&self, hostname: &str, path: &str) -> Result<String, SiteError> {
        if hostname.is_empty() {
            return Err(SiteError::HostnameUnset(self.name.clone()));
        }
        let landing = self
            .landing
            .as_deref()
            .ok_or_else(|| SiteError::NoLandingHost(self.name.clone()))?;
        Ok(format!("https://{}{}", join_host(landing, hostname), path))
    }

    /// Every proxied host under `hostname`
    pub fn hostnames(&self, hostname: &str) -> Vec<String> {
        self.hosts.iter().map(|sub| join_host(sub, hostname)).collect()
    }
}

fn join_host(sub: &str, hostname: &str) -> String {
    if sub.is_empty() {
        hostname.to_string()
    } else {
        format!("{}.{}", sub, hostname)
    }
}

/// Mutable per-site state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteBinding {
    pub enabled: bool,
    pub hostname: String,
}

/// Narrow contract the control plane depends on
pub trait SiteStore: Send + Sync {
    /// Names of every known site, in stable order
    fn names(&self) -> Vec<String>;

    fn definition(&self, name: &str) -> Result<SiteDefinition, SiteError>;

    /// Configured hostname (empty when unset or unknown)
    fn hostname(&self, name: &str) -> String;

    fn is_enabled(&self, name: &str) -> bool;

    fn set_enabled(&self, name: &str) -> Result<(), SiteError>;

    fn set_disabled(&self, name: &str) -> Result<(), SiteError>;

    /// Hostnames served by all enabled bindings
    fn active_hostnames(&self) -> Vec<String>;

    /// Resolve a lure path into a full URL using the site's landing host
    fn lure_url(&self, name: &str, path: &str) -> Result<String, SiteError> {
        let def = self.definition(name)?;
        def.lure_url(&self.hostname(name), path)
    }
}

#[derive(Debug, Default)]
struct Tables {
    definitions: BTreeMap<String, SiteDefinition>,
    bindings: BTreeMap<String, SiteBinding>,
}

/// In-memory site table guarded by a single lock so a toggle is never torn
#[derive(Debug, Default)]
pub struct SiteTable {
    inner: RwLock<Tables>,
}

impl SiteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a definition
    pub fn define(&self, def: SiteDefinition) {
        let mut tables = self.inner.write();
        tables.bindings.entry(def.name.clone()).or_default();
        tables.definitions.insert(def.name.clone(), def);
    }

    /// Register a name without a resolvable definition
    ///
    /// Such entries appear in [`SiteStore::names`] but fail [`SiteStore::definition`].
    pub fn declare(&self, name: impl Into<String>) {
        self.inner.write().bindings.entry(name.into()).or_default();
    }

    pub fn set_hostname(&self, name: &str, hostname: impl Into<String>) -> Result<(), SiteError> {
        let mut tables = self.inner.write();
        let binding = tables
            .bindings
            .get_mut(name)
            .ok_or_else(|| SiteError::NotFound(name.to_string()))?;
        binding.hostname = hostname.into();
        Ok(())
    }

    pub fn binding(&self, name: &str) -> Option<SiteBinding> {
        self.inner.read().bindings.get(name).cloned()
    }
}

impl SiteStore for SiteTable {
    fn names(&self) -> Vec<String> {
        self.inner.read().bindings.keys().cloned().collect()
    }

    fn definition(&self, name: &str) -> Result<SiteDefinition, SiteError> {
        self.inner
            .read()
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| SiteError::NotFound(name.to_string()))
    }

    fn hostname(&self, name: &str) -> String {
        self.inner
            .read()
            .bindings
            .get(name)
            .map(|b| b.hostname.clone())
            .unwrap_or_default()
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.inner
            .read()
            .bindings
            .get(name)
            .map(|b| b.enabled)
            .unwrap_or(false)
    }

    fn set_enabled(&self, name: &str) -> Result<(), SiteError> {
        let mut tables = self.inner.write();
        let template = tables
            .definitions
            .get(name)
            .map(|d| d.template)
            .ok_or_else(|| SiteError::NotFound(name.to_string()))?;
        if template {
            return Err(SiteError::Template(name.to_string()));
        }
        let binding = tables
            .bindings
            .get_mut(name)
            .ok_or_else(|| SiteError::NotFound(name.to_string()))?;
        if binding.hostname.is_empty() {
            return Err(SiteError::HostnameUnset(name.to_string()));
        }
        binding.enabled = true;
        Ok(())
    }

    fn set_disabled(&self, name: &str) -> Result<(), SiteError> {
        let mut tables = self.inner.write();
        if !tables.definitions.contains_key(name) {
            return Err(SiteError::NotFound(name.to_string()));
        }
        let binding = tables
            .bindings
            .get_mut(name)
            .ok_or_else(|| SiteError::NotFound(name.to_string()))?;
        binding.enabled = false;
        Ok(())
    }

    fn active_hostnames(&self) -> Vec<String> {
        let tables = self.inner.read();
        let mut hosts = Vec::new();
        for (name, binding) in &tables.bindings {
            if !binding.enabled || binding.hostname.is_empty() {
                continue;
            }
            if let Some(def) = tables.definitions.get(name) {
                for host in def.hostnames(&binding.hostname) {
                    if !hosts.contains(&host) {
                        hosts.push(host);
                    }
                }
            }
        }
        hosts
    }
}
