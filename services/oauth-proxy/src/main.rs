//! GitHub OAuth exchange proxy
//!
//! Single-binary service that sits between client applications (Chrome
//! extensions, web apps) and GitHub's OAuth endpoints so the client secret
//! never ships to untrusted code:
//! 1. Receives the provider callback with `code` + opaque `state`
//! 2. Validates the state token against the provider allow-list
//! 3. Redirects extensions back with the code, or exchanges it server-side
//!    for web apps
//! 4. Offers POST /exchange for clients completing the flow themselves

mod config;
mod handlers;
mod metrics;

use anyhow::{Context, Result};
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::AppState;

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the axum router with all routes and shared state.
///
/// The CORS middleware wraps routing so preflight OPTIONS requests are
/// answered for every path; the concurrency limit layer bounds concurrent
/// requests at `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::public_config))
        .route("/callback", get(handlers::callback))
        .route("/exchange", post(handlers::exchange))
        .route("/metrics", get(handlers::metrics_exposition))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(handlers::cors))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting github-oauth-proxy");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    let config = Config::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(p) => format!("failed to load config from {}", p.display()),
        None => "failed to load config".to_string(),
    })?;

    let registry = config::load_client_registry().context("failed to load client credentials")?;
    if registry.is_empty() {
        warn!("no OAuth clients configured; code exchange will report not configured");
    }

    info!(
        listen_addr = %config.server.listen_addr,
        allowed_providers = ?config.oauth.allowed_providers,
        token_url = %config.oauth.token_url,
        clients = registry.len(),
        "configuration loaded"
    );

    // One pooled client for all outbound exchanges; the timeout bounds the
    // single suspension point a request has.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.oauth.exchange_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let state = AppState {
        http,
        clients: Arc::new(registry),
        allowed_providers: Arc::new(config.oauth.allowed_providers.clone()),
        callback_url: config.oauth.callback_url.clone(),
        token_url: config.oauth.token_url.clone(),
        prometheus,
    };

    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "accepting requests");

    // Graceful shutdown:
    // 1. shutdown_signal() fires on SIGTERM/SIGINT
    // 2. axum stops accepting new connections and drains in-flight requests
    // 3. DRAIN_TIMEOUT keeps a hung exchange from blocking process exit;
    //    the timer starts at signal receipt, not server start
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
