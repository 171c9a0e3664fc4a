//! IP blacklist
//!
//! Membership-only set of addresses. When backed by a file, the file holds
//! one address per line (`#` starts a comment) and is rewritten after every
//! mutation.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Blacklist errors
#[derive(Debug, Error)]
pub enum BlacklistError {
    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    #[error("blacklist I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Narrow contract the control plane depends on
///
/// A failed write-back leaves the set unchanged.
pub trait BlacklistStore: Send + Sync {
    /// Current members, unordered
    fn ips(&self) -> Vec<String>;

    fn contains(&self, ip: &str) -> bool;

    /// Idempotent insert
    fn add(&self, ip: &str) -> Result<(), BlacklistError>;

    /// Idempotent removal
    fn remove(&self, ip: &str) -> Result<(), BlacklistError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(ip: &str) -> Result<String, BlacklistError> {
    ip.trim()
        .parse::<IpAddr>()
        .map(|addr| addr.to_string())
        .map_err(|_| BlacklistError::InvalidIp(ip.to_string()))
}

/// Lock-guarded IP set
#[derive(Debug, Default)]
pub struct IpBlacklist {
    ips: RwLock<HashSet<String>>,
    path: Option<PathBuf>,
}

impl IpBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path` (missing file = empty list); later mutations are written back
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BlacklistError> {
        let path = path.as_ref().to_path_buf();
        let mut ips = HashSet::new();
        if path.exists() {
            for line in std::fs::read_to_string(&path)?.lines() {
                let line = line.split('#').next().unwrap_or("").trim();
                if line.is_empty() {
                    continue;
                }
                match normalize(line) {
                    Ok(ip) => {
                        ips.insert(ip);
                    }
                    Err(e) => warn!(path = %path.display(), "Skipping blacklist entry: {}", e),
                }
            }
        }
        debug!(path = %path.display(), count = ips.len(), "Loaded blacklist");
        Ok(Self {
            ips: RwLock::new(ips),
            path: Some(path),
        })
    }

    fn persist(&self, ips: &HashSet<String>) -> Result<(), BlacklistError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut sorted: Vec<&String> = ips.iter().collect();
        sorted.sort();
        let mut out = String::new();
        for ip in sorted {
            out.push_str(ip);
            out.push('\n');
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, out)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl BlacklistStore for IpBlacklist {
    fn ips(&self) -> Vec<String> {
        self.ips.read().iter().cloned().collect()
    }

    fn contains(&self, ip: &str) -> bool {
        match normalize(ip) {
            Ok(ip) => self.ips.read().contains(&ip),
            Err(_) => false,
        }
    }

    fn add(&self, ip: &str) -> Result<(), BlacklistError> {
        let ip = normalize(ip)?;
        let mut ips = self.ips.write();
        if ips.insert(ip.clone()) {
            if let Err(e) = self.persist(&ips) {
                ips.remove(&ip);
                return Err(e);
            }
        }
        Ok(())
    }

    fn remove(&self, ip: &str) -> Result<(), BlacklistError> {
        let ip = normalize(ip)?;
        let mut ips = self.ips.write();
        if ips.remove(&ip) {
            if let Err(e) = self.persist(&ips) {
                ips.insert(ip);
                return Err(e);
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.ips.read().len()
    }
}
