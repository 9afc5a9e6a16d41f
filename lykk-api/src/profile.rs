use axum::{extract::State, routing::get, Extension, Json, Router};
use lykk_core::{ProfileUpdate, UserProfile};
use serde::Serialize;

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::{customer_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub full_name: String,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            full_name: profile.full_name(),
            profile,
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/profile", get(get_profile).put(update_profile))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            customer_auth_middleware,
        ))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.profiles.get_or_create(&claims.identity()).await?;
    Ok(Json(profile.into()))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.profiles.update(&claims.identity(), update).await?;
    Ok(Json(profile.into()))
}
