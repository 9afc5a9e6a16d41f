//! Integration tests for the HTTP API, run against the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use lykk_api::middleware::auth::{Claims, ROLE_ADMIN, ROLE_CUSTOMER};
use lykk_api::{app, AppState, AuthConfig};
use lykk_catalog::{TravelMode, TravelOption};
use lykk_core::TravelOptionRepository;
use lykk_shared::FixedClock;
use lykk_store::app_config::BusinessRules;
use lykk_store::MemoryStore;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
    store: MemoryStore,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap()
}

fn setup() -> TestApp {
    let store = MemoryStore::new();
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(FixedClock::new(now())),
        AuthConfig {
            secret: SECRET.to_string(),
        },
        BusinessRules::default(),
        None,
    );
    TestApp {
        router: app(state),
        store,
    }
}

fn token(sub: &str, role: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        email: format!("{}@example.com", sub),
        name: Some("Jane Doe".to_string()),
        role: role.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn add_option(store: &MemoryStore, departure: DateTime<Utc>, available: u32) -> TravelOption {
    let option = TravelOption {
        id: Uuid::new_v4(),
        code: format!("FL{}", &Uuid::new_v4().simple().to_string()[..6].to_uppercase()),
        mode: TravelMode::Flight,
        origin: "New York".to_string(),
        destination: "Los Angeles".to_string(),
        departure_date: departure.date_naive(),
        departure_time: departure.time(),
        arrival_date: departure.date_naive(),
        arrival_time: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
        price: Decimal::new(29999, 2),
        available_seats: available,
        total_seats: 10,
        created_at: now(),
        updated_at: now(),
    };
    store.insert_option(&option).await.unwrap();
    option
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn booking_body(seats: u32, names: Value) -> Value {
    json!({
        "seats": seats,
        "passenger_names": names,
        "contact_email": "jane@example.com",
        "contact_phone": "+15551234567",
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    add_option(&app.store, now() + Duration::days(9), 10).await;

    let (status, json) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "connected");
    assert_eq!(json["travel_options"], 1);
}

#[tokio::test]
async fn test_search_filters_and_validates() {
    let app = setup();
    add_option(&app.store, now() + Duration::days(9), 10).await;
    add_option(&app.store, now() + Duration::days(3), 10).await;
    add_option(&app.store, now() - Duration::days(2), 10).await;

    let (status, json) = send(&app, "GET", "/v1/travel-options?mode=flight&origin=new%20york", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_items"], 2);
    assert_eq!(json["items"][0]["is_available"], true);

    let (status, json) = send(&app, "GET", "/v1/travel-options?destination=paris", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_items"], 0);

    let (status, json) = send(&app, "GET", "/v1/travel-options?mode=boat&departure_date=2026-13-01", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["fields"]["mode"].is_string());
    assert_eq!(json["fields"]["departure_date"], "Enter a valid date.");
}

#[tokio::test]
async fn test_get_travel_option() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;

    let (status, json) = send(&app, "GET", &format!("/v1/travel-options/{}", option.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], option.code.as_str());
    assert_eq!(json["is_available"], true);

    let (status, _) = send(&app, "GET", &format!("/v1/travel-options/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_requires_authentication() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;
    let uri = format!("/v1/travel-options/{}/bookings", option.id);
    let body = booking_body(1, json!(["Jane Doe"]));

    let (status, _) = send(&app, "POST", &uri, None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", &uri, Some("not-a-jwt"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let guest = token("guest-1", "GUEST");
    let (status, _) = send(&app, "POST", &uri, Some(&guest), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_booking() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;
    let customer = token("user-1", ROLE_CUSTOMER);

    let (status, json) = send(
        &app,
        "POST",
        &format!("/v1/travel-options/{}/bookings", option.id),
        Some(&customer),
        Some(booking_body(2, json!("Jane Doe, John Doe"))),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "confirmed");
    assert_eq!(json["seats"], 2);
    assert_eq!(json["total_price"], "599.98");
    assert_eq!(json["passenger_names"], json!(["Jane Doe", "John Doe"]));
    assert_eq!(json["contact_email"], "jane@example.com");
    assert_eq!(json["travel_option"]["available_seats"], 8);
    assert_eq!(json["can_cancel"], true);
    assert!(json["booking_id"].as_str().unwrap().starts_with("TRV"));
}

#[tokio::test]
async fn test_booking_validation_errors() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;
    let customer = token("user-1", ROLE_CUSTOMER);
    let uri = format!("/v1/travel-options/{}/bookings", option.id);

    let (status, json) = send(&app, "POST", &uri, Some(&customer), Some(booking_body(2, json!(["Jane Doe"])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"]["passenger_names"], "Please provide exactly 2 passenger name(s).");

    let (status, json) = send(
        &app,
        "POST",
        &uri,
        Some(&customer),
        Some(json!({
            "seats": 1,
            "passenger_names": ["Jane Doe"],
            "contact_email": "not-an-email",
            "contact_phone": "+15551234567",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"]["contact_email"], "Enter a valid email address.");
}

#[tokio::test]
async fn test_malformed_booking_body_reports_fields() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;
    let customer = token("user-1", ROLE_CUSTOMER);
    let uri = format!("/v1/travel-options/{}/bookings", option.id);

    let (status, json) = send(
        &app,
        "POST",
        &uri,
        Some(&customer),
        Some(json!({
            "seats": -1,
            "passenger_names": ["Jane Doe"],
            "contact_email": "jane@example.com",
            "contact_phone": "+15551234567",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Validation failed");
    assert_eq!(json["fields"]["seats"], "Ensure this value is greater than or equal to 1.");

    let (status, json) = send(
        &app,
        "POST",
        &uri,
        Some(&customer),
        Some(json!({
            "seats": 1,
            "contact_email": "jane@example.com",
            "contact_phone": "+15551234567",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"]["passenger_names"], "Please provide exactly 1 passenger name(s).");

    let request = Request::builder()
        .method("POST")
        .uri(&uri)
        .header("authorization", format!("Bearer {}", customer))
        .header("content-type", "application/json")
        .body(Body::from("{\"seats\": 1,"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"], "Validation failed");
    assert!(json["fields"]["body"].is_string());

    let (_, json) = send(&app, "GET", &format!("/v1/travel-options/{}", option.id), None, None).await;
    assert_eq!(json["available_seats"], 10);
}

#[tokio::test]
async fn test_malformed_profile_and_admin_bodies_report_fields() {
    let app = setup();
    let customer = token("user-1", ROLE_CUSTOMER);
    let admin = token("admin-1", ROLE_ADMIN);

    let (status, json) = send(
        &app,
        "PUT",
        "/v1/profile",
        Some(&customer),
        Some(json!({ "first_name": "Jane", "last_name": "Doe", "date_of_birth": "not-a-date" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["fields"].is_object());

    let (status, json) = send(
        &app,
        "POST",
        "/v1/admin/travel-options",
        Some(&admin),
        Some(json!({ "origin": "Chicago", "destination": "Houston" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Validation failed");
    assert!(json["fields"]["mode"].is_string());
}

#[tokio::test]
async fn test_overbooking_is_a_retryable_conflict() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 2).await;
    let customer = token("user-1", ROLE_CUSTOMER);

    let (status, json) = send(
        &app,
        "POST",
        &format!("/v1/travel-options/{}/bookings", option.id),
        Some(&customer),
        Some(booking_body(3, json!(["A", "B", "C"]))),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["available"], 2);
    assert_eq!(json["requested"], 3);
    assert_eq!(json["retryable"], true);
}

#[tokio::test]
async fn test_cancel_booking() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;
    let customer = token("user-1", ROLE_CUSTOMER);

    let (_, booked) = send(
        &app,
        "POST",
        &format!("/v1/travel-options/{}/bookings", option.id),
        Some(&customer),
        Some(booking_body(2, json!(["Jane Doe", "John Doe"]))),
    )
    .await;
    let cancel_uri = format!("/v1/bookings/{}/cancel", booked["booking_id"].as_str().unwrap());

    let other = token("user-2", ROLE_CUSTOMER);
    let (status, _) = send(&app, "POST", &cancel_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, "POST", &cancel_uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");
    assert_eq!(json["total_price"], "599.98");
    assert_eq!(json["travel_option"]["available_seats"], 10);
    assert_eq!(json["can_cancel"], false);

    let (status, json) = send(&app, "POST", &cancel_uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_cancel_inside_window_is_rejected() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::hours(20), 10).await;
    let customer = token("user-1", ROLE_CUSTOMER);

    let (status, booked) = send(
        &app,
        "POST",
        &format!("/v1/travel-options/{}/bookings", option.id),
        Some(&customer),
        Some(booking_body(1, json!(["Jane Doe"]))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booked["can_cancel"], false);

    let (status, json) = send(
        &app,
        "POST",
        &format!("/v1/bookings/{}/cancel", booked["booking_id"].as_str().unwrap()),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("24 hours"));
}

#[tokio::test]
async fn test_booking_detail_visibility() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;
    let customer = token("user-1", ROLE_CUSTOMER);

    let (_, booked) = send(
        &app,
        "POST",
        &format!("/v1/travel-options/{}/bookings", option.id),
        Some(&customer),
        Some(booking_body(1, json!(["Jane Doe"]))),
    )
    .await;
    let uri = format!("/v1/bookings/{}", booked["booking_id"].as_str().unwrap());

    let (status, json) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking_id"], booked["booking_id"]);

    let (status, _) = send(&app, "GET", &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);

    let other = token("user-2", ROLE_CUSTOMER);
    let (status, _) = send(&app, "GET", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", &uri, Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/v1/bookings/TRVMISSING", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_bookings_pages_own_bookings() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;
    let customer = token("user-1", ROLE_CUSTOMER);
    let other = token("user-2", ROLE_CUSTOMER);
    let uri = format!("/v1/travel-options/{}/bookings", option.id);

    for _ in 0..3 {
        send(&app, "POST", &uri, Some(&customer), Some(booking_body(1, json!(["Jane Doe"])))).await;
    }
    send(&app, "POST", &uri, Some(&other), Some(booking_body(1, json!(["Max Mustermann"])))).await;

    let (status, json) = send(&app, "GET", "/v1/bookings?per_page=2", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_items"], 3);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["has_next"], true);

    let (status, _) = send(&app, "GET", "/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_and_contact_defaults() {
    let app = setup();
    let option = add_option(&app.store, now() + Duration::days(9), 10).await;
    let customer = token("user-1", ROLE_CUSTOMER);

    let (status, json) = send(&app, "GET", "/v1/profile", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["first_name"], "Jane");
    assert_eq!(json["last_name"], "Doe");
    assert_eq!(json["email"], "user-1@example.com");

    // No phone on file yet, so a booking without contact details cannot default one.
    let booking_uri = format!("/v1/travel-options/{}/bookings", option.id);
    let minimal = json!({ "seats": 1, "passenger_names": ["Jane Doe"] });
    let (status, json) = send(&app, "POST", &booking_uri, Some(&customer), Some(minimal.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["fields"]["contact_phone"].is_string());

    let (status, json) = send(
        &app,
        "PUT",
        "/v1/profile",
        Some(&customer),
        Some(json!({ "first_name": "Jane", "last_name": "Doe", "date_of_birth": "2030-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"]["date_of_birth"], "Date of birth cannot be in the future.");

    let (status, json) = send(
        &app,
        "PUT",
        "/v1/profile",
        Some(&customer),
        Some(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane.doe@example.com",
            "phone_number": "+15550001111",
            "date_of_birth": "1990-05-17",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["full_name"], "Jane Doe");
    assert_eq!(json["phone_number"], "+15550001111");

    let (status, json) = send(&app, "POST", &booking_uri, Some(&customer), Some(minimal)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["contact_email"], "jane.doe@example.com");
    assert_eq!(json["contact_phone"], "+15550001111");
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = setup();
    let customer = token("user-1", ROLE_CUSTOMER);

    let (status, _) = send(&app, "GET", "/v1/admin/stats", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/v1/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_manages_catalog() {
    let app = setup();
    let admin = token("admin-1", ROLE_ADMIN);
    let customer = token("user-1", ROLE_CUSTOMER);

    let (status, created) = send(
        &app,
        "POST",
        "/v1/admin/travel-options",
        Some(&admin),
        Some(json!({
            "mode": "train",
            "origin": "Boston",
            "destination": "Chicago",
            "departure_date": "2026-09-20",
            "departure_time": "09:30:00",
            "arrival_date": "2026-09-20",
            "arrival_time": "21:15:00",
            "price": "89.50",
            "total_seats": 40,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["code"].as_str().unwrap().starts_with("TR"));
    assert_eq!(created["available_seats"], 40);

    let (status, json) = send(
        &app,
        "POST",
        "/v1/admin/travel-options",
        Some(&admin),
        Some(json!({
            "mode": "bus",
            "origin": "Boston",
            "destination": "boston",
            "departure_date": "2026-09-20",
            "departure_time": "09:30:00",
            "arrival_date": "2026-09-19",
            "arrival_time": "21:15:00",
            "price": "10.00",
            "total_seats": 10,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["fields"]["destination"].is_string());
    assert!(json["fields"]["arrival_date"].is_string());

    let id = created["id"].as_str().unwrap().to_string();
    send(
        &app,
        "POST",
        &format!("/v1/travel-options/{}/bookings", id),
        Some(&customer),
        Some(booking_body(1, json!(["Jane Doe"]))),
    )
    .await;

    let (status, stats) = send(&app, "GET", "/v1/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["travel_options"], 1);
    assert_eq!(stats["bookings"], 1);
    assert_eq!(stats["bookings_by_status"]["confirmed"], 1);

    let (status, json) = send(&app, "DELETE", &format!("/v1/admin/travel-options/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bookings_removed"], 1);

    let (status, _) = send(&app, "DELETE", &format!("/v1/admin/travel-options/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_generates_sample_data() {
    let app = setup();
    let admin = token("admin-1", ROLE_ADMIN);

    let (status, json) = send(&app, "POST", "/v1/admin/sample-data", Some(&admin), Some(json!({ "count": 5 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["created"], 5);
    assert_eq!(app.store.option_count().await, 5);

    let (status, json) = send(&app, "POST", "/v1/admin/sample-data", Some(&admin), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["created"], 50);

    let (status, json) = send(&app, "POST", "/v1/admin/sample-data", Some(&admin), Some(json!({ "count": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["fields"]["count"].is_string());
}
