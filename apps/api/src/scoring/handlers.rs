//! Axum route handlers for the Scoring API.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::routes::UserQuery;
use crate::scoring::models::{BatchRequest, BatchResponse};
use crate::state::AppState;

/// POST /api/v1/score?user_id=
///
/// Scores every resume in `imgUrls` against `requirements`. The payload has one
/// slot per submitted resume, in order; failed resumes carry an error marker.
pub async fn handle_score(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let user_id = params.resolve()?;
    let Json(request) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let outcome = state.gateway.score_batch(user_id, &request).await?;

    Ok(Json(BatchResponse {
        success: true,
        payload: outcome.slots,
    }))
}

/// Any method other than POST on the scoring route.
pub async fn handle_unsupported_method() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "payload": null })),
    )
}
