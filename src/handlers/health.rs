use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

// Liveness of the gateway plus a summary of what it fronts
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "upstreams": {
            "total": state.pool.all().len(),
            "healthy": state.pool.healthy_count(),
        },
        "tracked_clients": state.rate_limiter.len(),
    }))
}
