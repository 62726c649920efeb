use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendationRequest, RecommendationResponse},
    services::recommendations,
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recommends movies for a genre and rating thresholds
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %request_id,
        genre = ?request.genre,
        min_rating = request.min_rating,
        min_votes = request.min_votes,
        "Processing recommendation request"
    );

    let recommendations = recommendations::recommend(
        &state.catalog,
        state.model.as_ref(),
        state.metadata.as_ref(),
        request,
    )
    .await
    .inspect_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Recommendation request failed")
    })?;

    tracing::info!(
        request_id = %request_id,
        results = recommendations.len(),
        "Recommendations completed"
    );

    Ok(Json(RecommendationResponse { recommendations }))
}
