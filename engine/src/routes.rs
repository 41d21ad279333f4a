use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tracing::info;
use uuid::Uuid;

use crate::{
    engine::PhishingEngine,
    error::{validation_error, AppError},
    metrics::Metrics,
    types::{ClassifyRequest, ClassifyResponse, MetricsResponse},
};

pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PhishingEngine>,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/classify", post(classify))
        .route("/metrics", get(metrics))
        .route("/health", get(health_check))
        .with_state(state)
}

pub async fn classify(
    State(state): State<AppState>,
    Json(payload): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let start_time = Instant::now();

    let url = payload.url.trim();
    if url.is_empty() {
        return Err(validation_error("url cannot be empty"));
    }
    if url.chars().count() > MAX_URL_LENGTH {
        return Err(validation_error("url too long"));
    }

    let result = state.engine.classify(url).await?;

    let elapsed = start_time.elapsed();
    state.metrics.observe_request(elapsed, result.is_phishing);

    let latency_ms = elapsed.as_secs_f64() * 1000.0;
    info!(
        "Classified {}: {} (score {:.3}, confidence {:.3}) in {:.2}ms",
        result.facts.domain,
        result.risk_level.as_str(),
        result.final_score,
        result.confidence,
        latency_ms
    );

    Ok(Json(ClassifyResponse {
        decision_id: Uuid::new_v4(),
        result,
        latency_ms,
    }))
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.metrics.snapshot())
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "phishguard-engine"
    }))
}
