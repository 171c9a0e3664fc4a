//! Proxy Admin - Entry Point
//!
//! Loads the seed state, wires the collaborators and serves the control
//! plane until Ctrl+C / SIGTERM.

use proxy_admin::certs::{CertProvisioner, CommandProvisioner, DisabledProvisioner};
use proxy_admin::{
    ApiState, CertCoordinator, Config, DashboardConfig, DashboardServer, IpBlacklist,
    OutboundProxy, ProxyEngine, SessionDb, SettingsStore, StateFile,
};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");
    let version_mode = args.iter().any(|a| a == "--version" || a == "-V");

    if version_mode {
        println!("proxy-admin {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if help_mode {
        println!("Proxy Admin v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: proxy-admin [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --version, -V      Print version");
        println!("  --help, -h         Show this help");
        println!();
        println!("Environment variables:");
        println!("  PROXY_ADMIN_STATE_FILE      TOML seed (sites, lures, config)");
        println!("  PROXY_ADMIN_SESSIONS_FILE   Session store JSON file");
        println!("  PROXY_ADMIN_BLACKLIST_FILE  Blacklist file (one IP per line)");
        println!("  PROXY_ADMIN_CERT_HOOK       Command run to provision certificates");
        println!("  ADMIN_BIND_ADDR             Listen address (default: 127.0.0.1)");
        println!("  ADMIN_PORT                  Listen port (default: 8080)");
        println!("  ADMIN_USERNAME              Basic auth user (default: admin)");
        println!("  ADMIN_PASSWORD              Basic auth password (random if unset)");
        println!("  ADMIN_REQUEST_TIMEOUT_SECS  Per-request timeout (default: 75)");
        println!("  ADMIN_CERT_WAIT_SECS        Certificate wait bound (default: 60)");
        println!("  ADMIN_SHUTDOWN_GRACE_SECS   Drain period on shutdown (default: 5)");
        println!("  ADMIN_CORS_ORIGINS          Comma-separated allowed origins (default: none)");
        println!("  ADMIN_LOG_REQUESTS          Log each request (default: true)");
        println!("  LOG_FORMAT                  'json' for structured logs");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Proxy Admin v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let dashboard = DashboardConfig::from_env();
    let state = build_state(&config, &dashboard)?;

    DashboardServer::new(dashboard, state).run().await?;
    Ok(())
}

/// Wire every collaborator from the process configuration
fn build_state(config: &Config, dashboard: &DashboardConfig) -> anyhow::Result<ApiState> {
    let seed = match &config.state_file {
        Some(path) => {
            info!("Loading state from {}", path.display());
            StateFile::load(path)?
        }
        None => {
            warn!("PROXY_ADMIN_STATE_FILE not set - starting with no sites");
            StateFile::default()
        }
    };

    let sites = Arc::new(seed.site_table());
    let lures = Arc::new(seed.lure_list());
    let settings = Arc::new(seed.settings());
    let sessions = Arc::new(SessionDb::open(&config.sessions_file)?);
    let blacklist = Arc::new(match &config.blacklist_file {
        Some(path) => IpBlacklist::open(path)?,
        None => IpBlacklist::new(),
    });

    let proxy = Arc::new(OutboundProxy::new());
    let stored_proxy = settings.proxy();
    if stored_proxy.enabled {
        if let Err(e) = proxy.set_proxy(&stored_proxy) {
            warn!("Stored proxy settings rejected: {}", e);
        }
    }

    let provisioner: Arc<dyn CertProvisioner> = match config
        .cert_hook
        .as_deref()
        .and_then(CommandProvisioner::from_command_line)
    {
        Some(hook) => Arc::new(hook),
        None => {
            info!("No certificate hook configured - certificate requests will fail");
            Arc::new(DisabledProvisioner)
        }
    };
    let certs = Arc::new(CertCoordinator::new(provisioner, dashboard.cert_wait));

    Ok(ApiState::new(
        sites, lures, sessions, blacklist, settings, proxy, certs,
    ))
}
