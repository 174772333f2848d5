use axum::{Json, extract::State};
use std::sync::Arc;

use super::dto::HealthResponse;
use super::error::ApiError;
use super::state::AppState;
use crate::models::{PriceQuery, Recommendation};

/// POST /recommend - Rank instances for a GPU model
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(mut query): Json<PriceQuery>,
) -> Result<Json<Recommendation>, ApiError> {
    query.gpu_model = query.gpu_model.trim().to_string();
    if query.gpu_model.is_empty() {
        return Err(ApiError::BadRequest("gpu_model cannot be empty".into()));
    }

    let recommendation = state.aggregator.recommend(&query).await?;
    Ok(Json(recommendation))
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        catalog_records: state.aggregator.catalog().len(),
        retrieval_ready: state.aggregator.index().is_available(),
    })
}
