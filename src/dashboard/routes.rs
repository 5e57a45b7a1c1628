//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ApiState>`.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::crypto::CoinScreener;
use crate::listings::{ListingSource, TargetSpec};
use crate::types::OuvcError;
use crate::valuation::{PropertyAnalysis, ValuationPipeline};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub source: Box<dyn ListingSource>,
    pub pipeline: ValuationPipeline,
    pub screener: CoinScreener,
    pub max_pages: u32,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CryptoScreenRequest {
    pub coin: String,
    pub new_coins_per_year: f64,
    /// Manual value-locked figure; omitted means auto-resolve.
    #[serde(default)]
    pub value_locked_usd: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct PropertyResponse {
    pub analysis: PropertyAnalysis,
    pub pool_size: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error wrapper mapping domain failures to HTTP statuses.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<OuvcError> for ApiError {
    fn from(err: OuvcError) -> Self {
        let status = match &err {
            OuvcError::InvalidCoordinate { .. }
            | OuvcError::MalformedRecord(_)
            | OuvcError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            OuvcError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OuvcError::Listings { .. } | OuvcError::DataProvider { .. } => StatusCode::BAD_GATEWAY,
            OuvcError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "Upstream request failed");
        ApiError::new(StatusCode::BAD_GATEWAY, format!("{err:#}"))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        source: state.source.name().to_string(),
    })
}

/// POST /api/property/analyze
pub async fn post_property_analyze(
    State(state): State<AppState>,
    Json(spec): Json<TargetSpec>,
) -> Result<Json<PropertyResponse>, ApiError> {
    let query = spec.search_query(state.max_pages);
    let pool = state.source.search(&query).await?;
    let target = spec.to_record(&pool);
    let analysis = state.pipeline.analyze(&target, &pool)?;

    Ok(Json(PropertyResponse {
        analysis,
        pool_size: pool.len(),
    }))
}

/// POST /api/crypto/screen
pub async fn post_crypto_screen(
    State(state): State<AppState>,
    Json(req): Json<CryptoScreenRequest>,
) -> Result<Json<crate::crypto::screen::CryptoScreenReport>, ApiError> {
    let report = state
        .screener
        .screen(&req.coin, req.new_coins_per_year, req.value_locked_usd)
        .await?;
    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
