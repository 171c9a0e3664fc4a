//! Lure collection
//!
//! Lures are entry paths routing visitors into a site. The collection is
//! append-only from the control plane's point of view; a lure's visible id
//! is its position at the time of listing.

use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of the random token in a generated lure path
pub const LURE_TOKEN_LEN: usize = 8;

/// Entry path bound to one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lure {
    /// Leading-slash path
    pub path: String,
    /// Bound site name
    pub phishlet: String,
    /// Explicit hostname override (empty = resolve through the site)
    #[serde(default)]
    pub hostname: String,
}

impl Lure {
    /// New lure with a freshly generated path
    ///
    /// No uniqueness check is made against existing lures; collisions in an
    /// 62^8 space are accepted.
    pub fn generate(phishlet: impl Into<String>) -> Self {
        Self {
            path: generate_lure_path(),
            phishlet: phishlet.into(),
            hostname: String::new(),
        }
    }
}

/// `/` followed by [`LURE_TOKEN_LEN`] random alphanumeric characters
pub fn generate_lure_path() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LURE_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("/{}", token)
}

/// Narrow contract the control plane depends on
pub trait LureStore: Send + Sync {
    /// Snapshot in insertion order
    fn list(&self) -> Vec<Lure>;

    fn add(&self, lure: Lure);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory, lock-guarded lure list
#[derive(Debug, Default)]
pub struct LureList {
    lures: RwLock<Vec<Lure>>,
}

impl LureList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lures(lures: Vec<Lure>) -> Self {
        Self {
            lures: RwLock::new(lures),
        }
    }
}

impl LureStore for LureList {
    fn list(&self) -> Vec<Lure> {
        self.lures.read().clone()
    }

    fn add(&self, lure: Lure) {
        self.lures.write().push(lure);
    }

    fn len(&self) -> usize {
        self.lures.read().len()
    }
}
