use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use lykk_catalog::TravelOption;
use lykk_core::{Booking, BookingDetails};
use lykk_shared::Page;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, optional_auth_middleware, Claims, OptionalClaims};
use crate::state::AppState;
use crate::travel::page_request;

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub travel_option: TravelOption,
    pub can_cancel: bool,
}

impl BookingResponse {
    pub fn new(state: &AppState, details: BookingDetails) -> Self {
        let can_cancel = state.lifecycle.can_cancel(&details);
        Self {
            booking: details.booking,
            travel_option: details.travel_option,
            can_cancel,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let customer = Router::new()
        .route("/v1/bookings", get(list_bookings))
        .route("/v1/bookings/{booking_id}/cancel", post(cancel_booking))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            customer_auth_middleware,
        ));

    // Detail pages are reachable by reference alone; signed-in users only see their own.
    let detail = Router::new()
        .route("/v1/bookings/{booking_id}", get(get_booking))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            optional_auth_middleware,
        ));

    customer.merge(detail)
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<BookingResponse>>, AppError> {
    let page = page_request(
        query.page.as_deref(),
        query.per_page.as_deref(),
        state.business_rules.bookings_page_size,
    );

    let bookings = state.lifecycle.list_bookings(&claims.sub, page).await?;
    Ok(Json(bookings.map(|details| BookingResponse::new(&state, details))))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(OptionalClaims(claims)): Extension<OptionalClaims>,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let user_id = claims.as_ref().map(|c| c.sub.as_str());
    let details = state.lifecycle.booking_detail(&booking_id, user_id).await?;
    Ok(Json(BookingResponse::new(&state, details)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let details = state.lifecycle.cancel_booking(&booking_id, &claims.sub).await?;
    Ok(Json(BookingResponse::new(&state, details)))
}
