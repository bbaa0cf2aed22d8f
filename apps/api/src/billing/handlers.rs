use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::routes::UserQuery;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub user_id: Uuid,
    pub credits_left: i32,
}

/// GET /api/v1/credits
pub async fn handle_get_credits(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<CreditsResponse>, AppError> {
    let user_id = params.resolve()?;
    let credits_left = state.ledger.balance(user_id).await?;
    Ok(Json(CreditsResponse {
        user_id,
        credits_left,
    }))
}
