//! Proxy Admin
//!
//! Control-plane API for a reverse-proxy runtime.
//!
//! # Features
//!
//! - **Site bindings**: enable/disable with template and hostname checks
//! - **Sessions**: summaries, full detail, deletion with store flush
//! - **Lures**: random entry paths with per-site URL resolution
//! - **Blacklist**: idempotent IP add/remove
//! - **Configuration**: allow-listed general and proxy updates
//! - **Certificates**: single-flight, deadline-bounded provisioning
//! - **Dashboard**: embedded front end behind HTTP basic auth
//!
//! # Architecture
//!
//! ```text
//! Operator ──► Auth Gate ──► Router ──► Handlers ──┬── SiteStore
//!                  │                               ├── LureStore
//!                  └──► Static bundle              ├── SessionStore
//!                                                  ├── BlacklistStore
//!                                                  ├── SettingsStore / ProxyEngine
//!                                                  └── CertCoordinator ──► CertProvisioner
//! ```

pub mod blacklist;
pub mod certs;
pub mod config;
pub mod dashboard;
pub mod lures;
pub mod outbound;
pub mod sessions;
pub mod settings;
pub mod sites;
pub mod state_file;

pub use blacklist::{BlacklistStore, IpBlacklist};
pub use certs::{CertCoordinator, CertError, CertProvisioner, CommandProvisioner, DisabledProvisioner};
pub use config::Config;
pub use dashboard::{ApiState, DashboardConfig, DashboardServer};
pub use lures::{Lure, LureList, LureStore};
pub use outbound::{OutboundProxy, ProxyEngine};
pub use sessions::{Session, SessionDb, SessionStore};
pub use settings::{GeneralConfig, ProxyConfig, SettingsCell, SettingsStore};
pub use sites::{SiteDefinition, SiteStore, SiteTable};
pub use state_file::StateFile;
