use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use lykk_core::{NewTravelOption, StoreStats, ValidationErrors};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::{admin_auth_middleware, Claims};
use crate::state::AppState;
use crate::travel::TravelOptionResponse;

const DEFAULT_SAMPLE_COUNT: usize = 50;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: Uuid,
    pub bookings_removed: u64,
}

#[derive(Debug, Deserialize)]
pub struct SampleDataRequest {
    #[serde(default = "default_sample_count")]
    pub count: usize,
}

fn default_sample_count() -> usize {
    DEFAULT_SAMPLE_COUNT
}

#[derive(Debug, Serialize)]
pub struct SampleDataResponse {
    pub created: usize,
    pub travel_options: Vec<TravelOptionResponse>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/travel-options", post(create_travel_option))
        .route("/v1/admin/travel-options/{id}", delete(delete_travel_option))
        .route("/v1/admin/sample-data", post(generate_sample_data))
        .route("/v1/admin/stats", get(stats))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            admin_auth_middleware,
        ))
}

async fn create_travel_option(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(input): JsonBody<NewTravelOption>,
) -> Result<(StatusCode, Json<TravelOptionResponse>), AppError> {
    let option = state.catalog.create_option(input).await?;
    tracing::info!("Admin {} created travel option {}", claims.sub, option.code);
    Ok((StatusCode::CREATED, Json(TravelOptionResponse::new(&state, option))))
}

async fn delete_travel_option(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let bookings_removed = state.catalog.delete_option(id).await?;
    tracing::info!("Admin {} deleted travel option {}", claims.sub, id);
    Ok(Json(DeleteResponse {
        deleted: id,
        bookings_removed,
    }))
}

async fn generate_sample_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SampleDataResponse>), AppError> {
    // An empty body means the default count.
    let count = if body.is_empty() {
        DEFAULT_SAMPLE_COUNT
    } else {
        serde_json::from_slice::<SampleDataRequest>(&body)
            .map_err(|e| AppError::Validation(ValidationErrors::single("count", e.to_string())))?
            .count
    };

    let options = state.catalog.generate_sample_data(count).await?;
    let travel_options: Vec<_> = options
        .into_iter()
        .map(|option| TravelOptionResponse::new(&state, option))
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(SampleDataResponse {
            created: travel_options.len(),
            travel_options,
        }),
    ))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(state.catalog.stats().await?))
}
