use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::session::SessionRow;
use crate::routes::UserQuery;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionHistoryResponse {
    pub retention_days: i64,
    pub sessions: Vec<SessionRow>,
}

/// Oldest timestamp still inside the history window.
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: i64) -> DateTime<Utc> {
    now - Duration::days(retention_days)
}

/// GET /api/v1/sessions
///
/// Scoring history for the retention window, newest first.
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<SessionHistoryResponse>, AppError> {
    let user_id = params.resolve()?;
    // 404 for unknown users, same as the scoring endpoint.
    state.ledger.balance(user_id).await?;

    let retention_days = state.config.session_retention_days;
    let since = retention_cutoff(Utc::now(), retention_days);
    let sessions = state.sessions.list_since(user_id, since).await?;

    Ok(Json(SessionHistoryResponse {
        retention_days,
        sessions,
    }))
}
