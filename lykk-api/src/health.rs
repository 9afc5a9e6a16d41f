use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Reports whether the store answers; never fails the request itself.
async fn health_check(State(state): State<AppState>) -> Response {
    match state.catalog.stats().await {
        Ok(stats) => Json(json!({
            "status": "ok",
            "database": "connected",
            "travel_options": stats.travel_options,
            "bookings": stats.bookings,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "database": "unreachable" })),
            )
                .into_response()
        }
    }
}
