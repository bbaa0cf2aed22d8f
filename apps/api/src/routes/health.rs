use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus cache hit/miss counters.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let options = state.gateway.options();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "screener-api",
        "billing_enabled": options.billing_enabled,
        "cache": {
            "enabled": options.caching_enabled,
            "backend": state.gateway.cache_backend(),
            "counters": state.gateway.counters(),
        }
    }))
}
