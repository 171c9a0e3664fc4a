//! Dashboard HTTP Server
//!
//! Axum-based server: basic-auth gate in front of everything, the JSON API
//! under `/api`, and the embedded dashboard bundle for every other path.
//! Shutdown drains in-flight requests for a bounded grace period, then
//! aborts whatever connections are left.

use crate::dashboard::api::{api_router, ApiState};
use crate::dashboard::auth::{basic_auth_middleware, BasicAuth};
use crate::dashboard::config::DashboardConfig;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware,
    response::{Html, IntoResponse, Response},
    Router,
};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use rust_embed::Embed;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Pause after a failed accept (e.g. fd exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Embedded static files for the dashboard
#[derive(Embed)]
#[folder = "src/dashboard/static/"]
struct StaticAssets;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Dashboard server
pub struct DashboardServer {
    config: DashboardConfig,
    state: ApiState,
}

impl DashboardServer {
    pub fn new(config: DashboardConfig, state: ApiState) -> Self {
        Self {
            config: config.normalized(),
            state,
        }
    }

    /// Build the router with all routes and middleware
    pub fn build_router(&self) -> Router {
        let auth = Arc::new(BasicAuth::new(
            self.config.admin_username.clone(),
            self.config.admin_password.clone(),
        ));

        let mut router = Router::new()
            .nest("/api", api_router(self.state.clone()))
            .fallback(static_handler)
            .layer(middleware::from_fn_with_state(auth, basic_auth_middleware))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(TimeoutLayer::new(self.config.request_timeout));

        if !self.config.cors_origins.is_empty() {
            let origins: Vec<HeaderValue> = self
                .config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods([Method::GET, Method::POST, Method::DELETE])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
            );
        }

        if self.config.log_requests {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Bind and serve until Ctrl+C / SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Bind and serve in the background
    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let listener = self.bind().await?;
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.serve(listener, async move {
            let _ = stop_rx.await;
        }));
        Ok(ServerHandle {
            local_addr,
            stop_tx: Some(stop_tx),
            task,
        })
    }

    async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        let local = listener.local_addr()?;
        info!("Control plane listening on http://{}", local);
        if !self.config.is_localhost() {
            warn!("Control plane bound to {} - reachable beyond this host", local);
        }
        Ok(listener)
    }

    /// Serve until `shutdown` resolves, then drain for at most `shutdown_grace`
    ///
    /// Connections still open when the grace period ends are aborted.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let grace = self.config.shutdown_grace;
        let router = self.build_router();

        let (draining_tx, draining_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        connections.spawn(serve_connection(stream, router.clone(), draining_rx.clone()));
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        let _ = draining_tx.send(true);
        info!(
            "Draining {} connection(s) (grace {}s)",
            connections.len(),
            grace.as_secs_f32()
        );

        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => info!("Control plane shut down gracefully"),
            Err(_) => {
                warn!(
                    "Drain exceeded {}s - closing {} remaining connection(s)",
                    grace.as_secs_f32(),
                    connections.len()
                );
                connections.shutdown().await;
            }
        }
        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }
}

/// Running server started with [`DashboardServer::start`]
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Trigger graceful shutdown and wait for the drain to finish
    pub async fn stop(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        (&mut self.task).await?
    }
}

/// Drive one HTTP/1 connection; stop taking new requests once draining starts
async fn serve_connection(stream: TcpStream, router: Router, mut draining: watch::Receiver<bool>) {
    let service = TowerToHyperService::new(router);
    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                debug!("Connection closed with error: {}", e);
            }
            return;
        }
        _ = draining.wait_for(|started| *started) => {}
    }

    conn.as_mut().graceful_shutdown();
    if let Err(e) = conn.await {
        debug!("Connection closed with error: {}", e);
    }
}

/// Serve embedded assets; `/` maps to `index.html`
async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    if path.contains("..") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let path = if path.is_empty() { "index.html" } else { path };

    match StaticAssets::get(path) {
        Some(content) if path == "index.html" => Html(content.data.into_owned()).into_response(),
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                Body::from(content.data.into_owned()),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
