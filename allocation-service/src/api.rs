//! HTTP surface for presentation layers: upload CSV text, list meters, run
//! an allocation.

use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use meter_client::{
    domain::{DuplicateDatePolicy, MeterTopology, TariffConfig},
    series::{self, MeterSummary},
};

use crate::allocation::AllocationEngine;
use crate::config::{AllocationConfig, ServerConfig};
use crate::merge;
use crate::pipeline::{self, AllocationReport, MeterSelection, PipelineError};
use crate::sources::{InlineCsvSource, ParsedSource};
use crate::transform;

/// Defaults applied when a request leaves a setting out.
#[derive(Debug, Clone, Default)]
pub struct ApiState {
    pub tariff: Option<TariffConfig>,
    pub allocation: AllocationConfig,
}

#[derive(Debug, serde::Deserialize)]
pub struct MetersRequest {
    pub sources: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct AllocateRequest {
    pub sources: Vec<String>,
    #[serde(flatten)]
    pub meters: MeterSelection,
    pub tariff: Option<TariffConfig>,
    pub topology: Option<MeterTopology>,
    pub duplicate_dates: Option<DuplicateDatePolicy>,
}

#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PipelineError::Parse(_) => StatusCode::BAD_REQUEST,
            PipelineError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::DuplicateDate { .. } => StatusCode::CONFLICT,
            PipelineError::MeterNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Source(_) | PipelineError::Transform(_) | PipelineError::Sink(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: ApiState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/meters", post(meters_handler))
        .route("/allocate", post(allocate_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub async fn serve(server: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr: SocketAddr = server
        .http_bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.http_bind_addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "allocation API listening");
    axum::serve(listener, router(state, server.max_body_bytes).into_make_service()).await?;
    Ok(())
}

async fn gather_uploads(texts: Vec<String>) -> Result<Vec<ParsedSource>, PipelineError> {
    let sources: Vec<InlineCsvSource> = texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| InlineCsvSource::new(format!("upload-{}", i + 1), text))
        .collect();
    pipeline::gather(&sources).await
}

pub async fn list_meters(req: MetersRequest) -> Result<Vec<MeterSummary>, PipelineError> {
    let merged = merge::merge_sources(gather_uploads(req.sources).await?.into_iter().map(|s| s.meters));
    Ok(series::list_meters(&merged))
}

pub async fn allocate(state: &ApiState, req: AllocateRequest) -> Result<AllocationReport, PipelineError> {
    let topology = req.topology.unwrap_or(state.allocation.topology);
    let policy = req.duplicate_dates.unwrap_or(state.allocation.duplicate_dates);
    let engine = AllocationEngine::new(req.tariff.as_ref().or(state.tariff.as_ref()), topology)?;

    let parsed = gather_uploads(req.sources).await?;
    let merged = merge::merge_sources(parsed.into_iter().map(|s| s.meters));
    let merged = transform::resolve_merged_duplicates(merged, policy)?;

    pipeline::build_report(&merged, &req.meters, &engine)
}

async fn meters_handler(Json(req): Json<MetersRequest>) -> Result<Json<Vec<MeterSummary>>, ApiError> {
    metrics::counter!("http_meters_requests_total").increment(1);
    Ok(Json(list_meters(req).await?))
}

async fn allocate_handler(
    State(state): State<ApiState>,
    Json(req): Json<AllocateRequest>,
) -> Result<Json<AllocationReport>, ApiError> {
    metrics::counter!("http_allocate_requests_total").increment(1);
    match allocate(&state, req).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            metrics::counter!("http_allocate_failed_total").increment(1);
            tracing::warn!(error = %e, "allocation request failed");
            Err(ApiError(e))
        }
    }
}
