pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::billing::handlers as billing;
use crate::errors::AppError;
use crate::scoring::handlers as scoring;
use crate::sessions::handlers as sessions;
use crate::state::AppState;

/// Caller identity. Authentication happens upstream; a missing, malformed
/// or unknown id is reported as 404.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

impl UserQuery {
    pub fn resolve(&self) -> Result<Uuid, AppError> {
        self.user_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id.trim()).ok())
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/score",
            post(scoring::handle_score).fallback(scoring::handle_unsupported_method),
        )
        .route("/api/v1/sessions", get(sessions::handle_list_sessions))
        .route("/api/v1/credits", get(billing::handle_get_credits))
        .with_state(state)
}
