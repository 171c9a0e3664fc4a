//! Control-plane Dashboard Module
//!
//! Authenticated HTTP surface over the proxy runtime's shared state, plus
//! the embedded dashboard front end.
//!
//! # Security Model
//!
//! - **Basic auth on every request**: static assets included, no sessions
//! - **Localhost binding by default**: a warning is logged otherwise
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                Dashboard Server                  │
//! ├──────────────────────────────────────────────────┤
//! │  *  (auth gate)                                  │
//! │  GET  /                      → Static files      │
//! │  GET  /api/status            → Counters          │
//! │  GET  /api/phishlets         → Site bindings     │
//! │  POST /api/phishlets/{n}/... → enable / disable  │
//! │  GET  /api/sessions[/{id}]   → Captured sessions │
//! │  DEL  /api/sessions/{id}     → Delete session    │
//! │  GET|POST /api/lures         → Lures             │
//! │  GET|POST /api/blacklist     → IP blacklist      │
//! │  GET|POST /api/config        → General config    │
//! │  POST /api/proxy             → Outbound proxy    │
//! │  POST /api/test-certs        → Provision certs   │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod server;

pub use api::{api_router, ActionResponse, ApiError, ApiState, ErrorResponse, JsonBody};
pub use auth::{basic_auth_middleware, basic_header, BasicAuth};
pub use config::DashboardConfig;
pub use server::{DashboardServer, ServerError, ServerHandle};
