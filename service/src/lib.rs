//! HTTP front end for the workshop recommender.
//!
//! The bundle is loaded once into an immutable [`AppState`] shared by every
//! request. Scoring runs on the blocking pool under a per-request timeout.
//!
//! Routes:
//! - `POST /predict` — one member record in, `{"recommendations": [...]}` out
//! - `GET /health` — label count and bundle schema version

pub mod config;
pub mod error;

pub use config::ServiceConfig;
pub use error::ServiceError;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use formation_recommender::{Recommendation, Recommender};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shared, read-only request context.
#[derive(Debug)]
pub struct AppState {
    recommender: Recommender,
    top_k: usize,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(recommender: Recommender, top_k: usize, request_timeout: Duration) -> Self {
        Self {
            recommender,
            top_k,
            request_timeout,
        }
    }

    /// Loads the bundle named by `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Self::load(&config.bundle, config.top_k, config.request_timeout())
    }

    /// Loads a bundle; without an explicit `top_k` the bundle's own default applies.
    pub fn load(bundle: &Path, top_k: Option<usize>, request_timeout: Duration) -> Result<Self, ServiceError> {
        let recommender = Recommender::load(bundle)?;
        let top_k = top_k.unwrap_or_else(|| recommender.default_top_k());
        info!(
            bundle = %bundle.display(),
            labels = recommender.labels().len(),
            top_k,
            "model bundle loaded"
        );
        Ok(Self::new(recommender, top_k, request_timeout))
    }

    pub fn recommender(&self) -> &Recommender {
        &self.recommender
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub labels: usize,
    pub schema_version: u32,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
}

/// `POST /predict` — top-k workshops for one member.
async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => return error::malformed_json(e),
    };
    match score(state, request).await {
        Ok(recommendations) => Json(PredictResponse { recommendations }).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn score(state: Arc<AppState>, request: Value) -> Result<Vec<Recommendation>, ServiceError> {
    let started = Instant::now();
    let budget = state.request_timeout;
    let worker = Arc::clone(&state);
    let job = tokio::task::spawn_blocking(move || {
        worker.recommender.recommend_json(&request, worker.top_k)
    });

    let recommendations = tokio::time::timeout(budget, job)
        .await
        .map_err(|_| ServiceError::Timeout(budget))?
        .map_err(|e| ServiceError::Model(format!("prediction task failed: {}", e)))??;

    debug!(
        returned = recommendations.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scored request"
    );
    Ok(recommendations)
}

/// `GET /health`
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        labels: state.recommender.labels().len(),
        schema_version: state.recommender.bundle().schema_version(),
    })
}
