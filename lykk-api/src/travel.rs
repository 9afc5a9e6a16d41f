use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use lykk_catalog::TravelOption;
use lykk_core::{BookingRequest, TravelSearch};
use lykk_shared::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bookings::BookingResponse;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::{customer_auth_middleware, Claims};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub mode: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TravelOptionResponse {
    #[serde(flatten)]
    pub option: TravelOption,
    pub is_available: bool,
}

impl TravelOptionResponse {
    pub fn new(state: &AppState, option: TravelOption) -> Self {
        Self {
            is_available: state.lifecycle.is_available(&option),
            option,
        }
    }
}

/// Passenger names as a JSON list or a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PassengerNames {
    List(Vec<String>),
    Text(String),
}

impl PassengerNames {
    fn into_vec(self) -> Vec<String> {
        match self {
            PassengerNames::List(names) => names,
            PassengerNames::Text(text) => text.split(',').map(str::to_string).collect(),
        }
    }
}

/// Booking form as posted. Seats and names are taken loosely here so that bad
/// values come back as field errors from `BookingRequest::validate`.
#[derive(Debug, Deserialize)]
pub struct CreateBookingPayload {
    #[serde(default)]
    pub seats: i64,
    #[serde(default)]
    pub passenger_names: Option<PassengerNames>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl CreateBookingPayload {
    /// Non-positive counts become 0, which validation rejects.
    fn seat_count(&self) -> u32 {
        u32::try_from(self.seats.max(0)).unwrap_or(u32::MAX)
    }
}

/// Lenient page parsing: anything unparsable means the first page.
pub fn page_request(page: Option<&str>, per_page: Option<&str>, default_per_page: u32) -> PageRequest {
    let page = page.and_then(|p| p.trim().parse().ok()).unwrap_or(1);
    let per_page = per_page
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(default_per_page);
    PageRequest::new(page, per_page)
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/v1/travel-options", get(search_travel_options))
        .route("/v1/travel-options/{id}", get(get_travel_option));

    let protected = Router::new()
        .route("/v1/travel-options/{id}/bookings", post(create_booking))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            customer_auth_middleware,
        ));

    public.merge(protected)
}

async fn search_travel_options(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Page<TravelOptionResponse>>, AppError> {
    let search = TravelSearch::parse(
        query.mode.as_deref(),
        query.origin.as_deref(),
        query.destination.as_deref(),
        query.departure_date.as_deref(),
    )?;
    let page = page_request(
        query.page.as_deref(),
        query.per_page.as_deref(),
        state.business_rules.search_page_size,
    );

    let results = state.catalog.search(&search, page).await?;
    Ok(Json(results.map(|option| TravelOptionResponse::new(&state, option))))
}

async fn get_travel_option(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TravelOptionResponse>, AppError> {
    let option = state.catalog.get_option(id).await?;
    Ok(Json(TravelOptionResponse::new(&state, option)))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<CreateBookingPayload>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let identity = claims.identity();

    let seats = payload.seat_count();
    let passenger_names = payload
        .passenger_names
        .map(PassengerNames::into_vec)
        .unwrap_or_default();

    let (contact_email, contact_phone) = match (payload.contact_email, payload.contact_phone) {
        (Some(email), Some(phone)) => (email, phone),
        (email, phone) => {
            let (default_email, default_phone) = state.profiles.contact_defaults(&identity).await?;
            (email.unwrap_or(default_email), phone.unwrap_or(default_phone))
        }
    };

    let request = BookingRequest {
        seats,
        passenger_names,
        contact_email,
        contact_phone,
    };

    let booking = state
        .lifecycle
        .create_booking(&identity.user_id, id, request)
        .await?;
    let details = state
        .lifecycle
        .booking_detail(&booking.booking_id, Some(&identity.user_id))
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::new(&state, details))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_is_lenient() {
        assert_eq!(page_request(None, None, 12), PageRequest::new(1, 12));
        assert_eq!(page_request(Some("abc"), Some("5"), 12), PageRequest::new(1, 5));
        assert_eq!(page_request(Some(" 3 "), Some("1000"), 12), PageRequest::new(3, 100));
    }

    #[test]
    fn test_passenger_names_accept_text_or_list() {
        let text: PassengerNames = serde_json::from_str("\"John Doe, Jane Doe\"").unwrap();
        assert_eq!(text.into_vec(), vec!["John Doe", " Jane Doe"]);

        let list: PassengerNames = serde_json::from_str("[\"John Doe\"]").unwrap();
        assert_eq!(list.into_vec(), vec!["John Doe"]);
    }

    #[test]
    fn test_seat_count_clamps_out_of_range_values() {
        let payload = |seats: i64| CreateBookingPayload {
            seats,
            passenger_names: None,
            contact_email: None,
            contact_phone: None,
        };
        assert_eq!(payload(-1).seat_count(), 0);
        assert_eq!(payload(3).seat_count(), 3);
        assert_eq!(payload(i64::MAX).seat_count(), u32::MAX);
    }
}
