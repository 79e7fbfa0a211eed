//! Analytics Embed Gateway
//!
//! Single-binary Rust service that turns an HTTP request into a
//! short-lived embed session:
//! 1. Resolves embed settings from the environment at request entry
//! 2. Exchanges client credentials for a platform access token
//! 3. Authorizes the configured asset for embedding
//! 4. Returns HTML that loads the embed with the minted token

mod config;
mod error;
mod handler;
mod metrics;
mod render;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::ServerConfig;
use crate::handler::PipelineState;

/// Time allowed for in-flight requests to drain after SIGTERM/SIGINT.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    pipeline: PipelineState,
    prometheus: PrometheusHandle,
    started_at: Instant,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections` so a
/// flood of embed requests cannot exhaust the process.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/", any(embed_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the log filter reads LOG_LEVEL. Real environment
    // variables always win over file entries.
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting analytics-embed-gateway");
    if dotenv_loaded {
        info!(".env overlay loaded");
    }

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    let server_config =
        ServerConfig::from_env().context("failed to resolve server configuration")?;

    // Embed settings are resolved per request. Resolve once at startup
    // so a broken deployment shows up in the logs immediately instead
    // of on the first request.
    match config::EmbedConfig::from_env() {
        Ok(embed) => info!(
            kind = %embed.kind,
            mode = %embed.response_mode,
            asset_id = %embed.asset_id,
            "embed configuration resolved"
        ),
        Err(e) => warn!(
            error = %e,
            "embed configuration incomplete, requests will fail until corrected"
        ),
    }

    let pipeline = PipelineState {
        client: reqwest::Client::new(),
        requests_total: Arc::new(AtomicU64::new(0)),
        errors_total: Arc::new(AtomicU64::new(0)),
        in_flight: Arc::new(AtomicU64::new(0)),
    };

    // Clone in_flight counter for drain observability after shutdown
    let in_flight = pipeline.in_flight.clone();

    let app_state = AppState {
        pipeline,
        prometheus: prometheus_handle,
        started_at: Instant::now(),
    };

    let app = build_router(app_state, server_config.max_connections);

    let listener = TcpListener::bind(server_config.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", server_config.listen_addr))?;

    info!(addr = %server_config.listen_addr, "accepting requests");

    // Graceful shutdown with drain timeout enforcement:
    // 1. shutdown_signal() fires on SIGTERM/SIGINT
    // 2. axum stops accepting new connections and drains in-flight requests
    // 3. DRAIN_TIMEOUT bounds the drain so a slow client cannot block exit
    //
    // The drain timer starts when the signal fires, not when the server
    // starts, so the server is notified first and then raced against the
    // timeout.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    // Wait for the OS signal
    shutdown_signal().await;

    // Signal the server to begin draining
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
            let remaining = in_flight.load(Ordering::Relaxed);
            warn!(
                remaining,
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Entry point for embed requests on `/`. Accepts any method; the
/// pipeline itself answers OPTIONS preflight and treats GET and POST
/// alike.
async fn embed_handler(State(state): State<AppState>, method: Method) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    handler::handle_embed(&state.pipeline, &method, request_id).await
}

/// Health endpoint: JSON with status, uptime, and request counters.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.started_at.elapsed().as_secs();
    let requests = state.pipeline.requests_total.load(Ordering::Relaxed);
    let errors = state.pipeline.errors_total.load(Ordering::Relaxed);

    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": uptime,
        "requests_served": requests,
        "errors_total": errors,
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
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
