//! Request pipeline
//!
//! Every embed request runs four stages in order: configuration
//! resolution, client-credentials token exchange, embed authorization,
//! and HTML rendering. OPTIONS requests answer CORS preflight before
//! the pipeline starts, so they never read configuration or touch the
//! platform.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::http::Method;
use axum::response::Response;
use tracing::{error, info, instrument};

use embed_auth::{EmbedRequest, authorize_embed, exchange_client_credentials};

use crate::config::EmbedConfig;
use crate::error::Error;
use crate::{metrics, render};

/// Shared pipeline dependencies and service counters.
#[derive(Clone)]
pub struct PipelineState {
    pub client: reqwest::Client,
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub in_flight: Arc<AtomicU64>,
}

/// Decrements the in-flight gauge on drop, so a request future that is
/// cancelled mid-pipeline still releases its slot.
struct InFlightGuard(Arc<AtomicU64>);

impl InFlightGuard {
    fn enter(gauge: &Arc<AtomicU64>) -> Self {
        gauge.fetch_add(1, Ordering::Relaxed);
        Self(gauge.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Entry point for `/`. All bookkeeping happens here so the stages
/// themselves stay pure.
#[instrument(skip_all, fields(request_id = %request_id, method = %method))]
pub async fn handle_embed(state: &PipelineState, method: &Method, request_id: String) -> Response {
    let started = Instant::now();
    state.requests_total.fetch_add(1, Ordering::Relaxed);
    let _in_flight = InFlightGuard::enter(&state.in_flight);

    let response = if method == Method::OPTIONS {
        render::preflight()
    } else {
        match run_pipeline(state).await {
            Ok(response) => response,
            Err(err) => {
                state.errors_total.fetch_add(1, Ordering::Relaxed);
                metrics::record_pipeline_error(err.stage());
                error!(stage = err.stage(), error = %err, "pipeline failed");
                err.to_response(&request_id)
            }
        }
    };

    metrics::record_request(
        response.status().as_u16(),
        method.as_str(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn run_pipeline(state: &PipelineState) -> Result<Response, Error> {
    let config = EmbedConfig::from_env()?;
    let profile = config.kind.profile();

    let access = exchange_client_credentials(
        &state.client,
        &config.base_url,
        &config.client_id,
        &config.client_secret,
        profile.scope,
    )
    .await?;

    let request = EmbedRequest {
        kind: config.kind,
        asset_id: &config.asset_id,
        session_length: config.session_minutes,
        filters: config.filters.as_ref(),
    };
    let token = authorize_embed(&state.client, &config.base_url, access, &request).await?;

    info!(
        asset_id = %token.asset_id(),
        kind = %config.kind,
        mode = %config.response_mode,
        permissions = token.permissions().len(),
        "embed token issued"
    );

    Ok(render::compose(
        config.response_mode,
        &config.base_url,
        config.kind,
        &token,
    ))
}
