//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (request id, logging, metrics, timeout, tracing)
//! - Runtime selection for development and production mode
//! - Graceful shutdown handling

use crate::config::{ServerConfig, PRODUCTION_WORKERS};
use crate::middleware::{log_requests, request_id, track_metrics};
use crate::routes::{api_test, health, hello, matching, not_found};
use crate::state::ServerState;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Build the Axum router with all routes and middleware
///
/// Middleware stack, outermost first:
/// 1. Tracing spans
/// 2. Request ID tracking
/// 3. Request logging
/// 4. Timeout handling
/// 5. Per-route request metrics
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/api/test", get(api_test))
        .route("/api/match-images/", post(matching::match_images))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route_layer(from_fn_with_state(state.clone(), track_metrics))
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install the global tracing subscriber: JSON lines in production,
/// human-readable output otherwise. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    if config.production {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Initialise logging, build the runtime the mode calls for and serve until
/// shutdown.
///
/// Production mode runs a multi-threaded runtime with exactly
/// [`PRODUCTION_WORKERS`] workers bound to [`PRODUCTION_ADDR`](crate::config::PRODUCTION_ADDR);
/// development mode runs a current-thread runtime on `bind_addr:port`.
pub fn run(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config);

    let runtime = if config.production {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(PRODUCTION_WORKERS)
            .thread_name("facematch-worker")
            .enable_all()
            .build()?
    } else {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
    };

    runtime.block_on(start_server(config))
}

/// Start the facematch HTTP server
///
/// Builds the shared state (encoder, Firestore client, image fetcher,
/// metrics), binds the configured address and serves until SIGTERM or Ctrl+C.
/// Expects a tracing subscriber to be installed already; [`run`] does that.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    if config.production && config.uses_default_secret() {
        tracing::warn!("running in production with the default secret key; set FACEMATCH_SECRET_KEY");
    }

    let addr: SocketAddr = config.socket_addr()?;
    let state = Arc::new(ServerState::new(config.clone())?);
    let app = build_router(state);
    health::mark_started();

    tracing::info!(
        %addr,
        production = config.production,
        batch_size = config.batch_size,
        tolerance = config.tolerance,
        encoder = %config.encoder.mode,
        "Starting facematch server"
    );
    tracing::info!(
        "Timeout: {}s, upload dir: {}",
        config.timeout_secs,
        config
            .upload_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "disabled".into())
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
