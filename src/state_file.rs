//! TOML seed file for the in-process collaborators
//!
//! Site definitions are normally produced by the template parser; this file
//! is the hand-off format it writes for the control plane.

use crate::lures::{Lure, LureList};
use crate::settings::{GeneralConfig, ProxyConfig, SettingsCell};
use crate::sites::{SiteDefinition, SiteTable};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("failed to read state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse state file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("lure '{path}' references unknown phishlet '{phishlet}'")]
    UnknownLureSite { path: String, phishlet: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    #[serde(flatten)]
    pub definition: SiteDefinition,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Parsed seed file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateFile {
    pub general: GeneralConfig,
    pub proxy: ProxyConfig,
    pub sites: Vec<SiteEntry>,
    pub lures: Vec<Lure>,
}

impl StateFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StateFileError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, StateFileError> {
        let state: StateFile = toml::from_str(raw)?;
        for lure in &state.lures {
            if !state.sites.iter().any(|s| s.definition.name == lure.phishlet) {
                return Err(StateFileError::UnknownLureSite {
                    path: lure.path.clone(),
                    phishlet: lure.phishlet.clone(),
                });
            }
        }
        Ok(state)
    }

    /// Build the site table
    ///
    /// Enabled flags that violate binding rules (template, no hostname) are dropped.
    pub fn site_table(&self) -> SiteTable {
        use crate::sites::SiteStore;

        let table = SiteTable::new();
        for entry in &self.sites {
            table.define(entry.definition.clone());
            let name = &entry.definition.name;
            if !entry.hostname.is_empty() {
                let _ = table.set_hostname(name, entry.hostname.clone());
            }
            if entry.enabled {
                if let Err(e) = table.set_enabled(name) {
                    tracing::warn!("Not enabling {} from state file: {}", name, e);
                }
            }
        }
        table
    }

    pub fn lure_list(&self) -> LureList {
        LureList::with_lures(self.lures.clone())
    }

    pub fn settings(&self) -> SettingsCell {
        SettingsCell::new(self.general.clone(), self.proxy.clone())
    }
}
