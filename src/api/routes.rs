use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::APP_VERSION;
use crate::error::AppError;
use crate::export::export_results;
use crate::source::SnapshotSource;
use crate::state::RunStore;
use crate::types::{RunStats, ScoredResult, Snapshot};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<RunStore>,
    pub source: Arc<dyn SnapshotSource>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    pub export_dir: PathBuf,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/fetch-data", get(fetch_data))
        .route("/api/analyze", get(analyze))
        .route("/api/stats", get(get_stats))
        .route("/api/export", get(export))
        .route("/api/top-performers/:count", get(top_performers))
        .route("/api/stock/:symbol", get(get_stock))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct FetchResponse {
    pub success: bool,
    pub data: Vec<Snapshot>,
    pub count: usize,
    pub source: &'static str,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub results: Vec<ScoredResult>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Serialize)]
pub struct TopPerformersResponse {
    pub success: bool,
    pub top_performers: Vec<ScoredResult>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct StockResponse {
    pub success: bool,
    pub stock: ScoredResult,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub source: &'static str,
    pub last_fetch_source: Option<&'static str>,
    pub fetch_count: u64,
    pub fetch_failures: u64,
    pub quote_latency_p50_ms: Option<f64>,
    pub quote_latency_p99_ms: Option<f64>,
    pub quote_samples: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn fetch_data(State(state): State<ApiState>) -> Result<Json<FetchResponse>, AppError> {
    let batch = match state.source.snapshots().await {
        Ok(b) => b,
        Err(e) => {
            state.health.record_failure();
            error!("Fetch failed: {e}");
            return Err(match e {
                AppError::Acquisition(_) => e,
                other => AppError::Acquisition(other.to_string()),
            });
        }
    };

    state.health.record_fetch();
    state.store.replace_snapshots(batch.provenance, batch.snapshots.clone());
    info!(source = batch.provenance, count = batch.snapshots.len(), "snapshots replaced");

    Ok(Json(FetchResponse {
        success: true,
        count: batch.snapshots.len(),
        data: batch.snapshots,
        source: batch.provenance,
        timestamp: Utc::now(),
        message: "Data fetched successfully".to_string(),
    }))
}

async fn analyze(State(state): State<ApiState>) -> Result<Json<AnalyzeResponse>, AppError> {
    let results = state.store.analyze().ok_or_else(|| {
        AppError::NoData("No data available. Please fetch data first.".to_string())
    })?;
    info!("Analysis found {} trending stocks", results.len());

    Ok(Json(AnalyzeResponse {
        success: true,
        count: results.len(),
        message: format!("Found {} trending stocks", results.len()),
        results,
        timestamp: Utc::now(),
    }))
}

async fn get_stats(State(state): State<ApiState>) -> Json<RunStats> {
    Json(state.store.stats())
}

async fn export(State(state): State<ApiState>) -> Result<impl IntoResponse, AppError> {
    let results = state.store.results();
    if results.is_empty() {
        return Err(AppError::NoData("No results to export".to_string()));
    }

    let path = export_results(&state.export_dir, &results, &Local::now())?;
    let body = tokio::fs::read(&path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}

async fn top_performers(
    State(state): State<ApiState>,
    Path(count): Path<usize>,
) -> Result<Json<TopPerformersResponse>, AppError> {
    if !state.store.has_results() {
        return Err(AppError::NoData("No analysis results available".to_string()));
    }
    let top = state.store.top(count);

    Ok(Json(TopPerformersResponse {
        success: true,
        count: top.len(),
        top_performers: top,
    }))
}

async fn get_stock(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockResponse>, AppError> {
    let stock = state
        .store
        .find(&symbol)
        .ok_or_else(|| AppError::NotFound(format!("Stock {symbol} not found in results")))?;
    Ok(Json(StockResponse { success: true, stock }))
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: APP_VERSION,
        source: state.source.name(),
        last_fetch_source: state.store.provenance(),
        fetch_count: state.health.fetch_count(),
        fetch_failures: state.health.fetch_failures(),
        quote_latency_p50_ms: state.latency.quantile_ms(0.5),
        quote_latency_p99_ms: state.latency.quantile_ms(0.99),
        quote_samples: state.latency.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
