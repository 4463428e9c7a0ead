use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wayfare_api::auth::{issue_token, ROLE_ADMIN, ROLE_CUSTOMER};
use wayfare_api::{app, AppState, Backends};
use wayfare_core::flight::FlightView;
use wayfare_store::app_config::{
    AuthConfig, BookingSettings, Config, DatabaseConfig, PricingSettings, RateLimitConfig,
    SearchSettings, ServerConfig, StorageBackend,
};
use wayfare_store::memory::{FlightFixture, InMemoryStore};

struct TestApp {
    router: Router,
    state: AppState,
    store: Arc<InMemoryStore>,
}

fn test_config() -> Config {
    Config {
        server: ServerConfig { port: 0 },
        database: DatabaseConfig {
            storage: StorageBackend::Memory,
            url: String::new(),
            max_connections: 1,
            run_migrations: false,
        },
        redis: None,
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_seconds: 3600,
        },
        pricing: PricingSettings::default(),
        booking: BookingSettings::default(),
        rate_limit: RateLimitConfig::default(),
        search: SearchSettings::default(),
    }
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let (state, _worker) = AppState::build(&test_config(), "test", Backends::memory(store.clone()));
        Self {
            router: app(state.clone()),
            state,
            store,
        }
    }

    fn token(&self, user_id: Uuid, role: &str) -> String {
        issue_token(&self.state.auth, user_id, "lan@example.com", role).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn booking_body(flight: &FlightView) -> Value {
    json!({
        "flight_id": flight.flight.id,
        "passengers": [
            {
                "first_name": "Lan",
                "last_name": "Nguyen",
                "passenger_type": "adult",
                "date_of_birth": "1990-04-12",
                "citizen_id": "079090001234"
            },
            {
                "first_name": "Be",
                "last_name": "Nguyen",
                "passenger_type": "infant",
                "date_of_birth": (chrono::Utc::now().date_naive() - chrono::Duration::days(200)).to_string()
            }
        ],
        "contact_info": {
            "first_name": "Lan",
            "last_name": "Nguyen",
            "email": "lan@example.com",
            "phone": "0901234567"
        }
    })
}

#[tokio::test]
async fn test_health_reports_memory_storage() {
    let t = TestApp::new();
    let (status, body) = t.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_search_returns_paginated_envelope() {
    let t = TestApp::new();
    let flight = t.store.seed_flight(FlightFixture::default()).await;
    let date = flight.flight.departure_time.date_naive();

    let uri = format!(
        "/flights/search?departure_airport_code=han&arrival_airport_code=SGN&departure_date={}&passengers=2",
        date
    );
    let (status, body) = t.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["flight_number"], "VN201");
    assert_eq!(body["data"][0]["starting_price"], 1_200_000);
    assert_eq!(body["data"][0]["available_seats"], 6);

    let (status, body) = t
        .send(Method::GET, "/flights/search?departure_airport_code=HAN", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_flight_detail_and_seat_reads() {
    let t = TestApp::new();
    let flight = t.store.seed_flight(FlightFixture::default()).await;
    let id = flight.flight.id;

    let (status, body) = t.send(Method::GET, &format!("/flights/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["seat_map"].as_array().unwrap().len(), 10);

    let (status, body) = t
        .send(Method::GET, &format!("/flights/{}/availability?class_code=business&count=5", id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_available"], false);
    assert_eq!(body["data"]["available_seats"], 4);

    let (status, _) = t
        .send(Method::GET, &format!("/flights/{}", Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_booking_prices_lap_infant() {
    let t = TestApp::new();
    let flight = t.store.seed_flight(FlightFixture::default()).await;
    let user_id = Uuid::new_v4();
    let token = t.token(user_id, ROLE_CUSTOMER);

    let (status, body) = t
        .send(Method::POST, "/bookings", Some(&token), Some(booking_body(&flight)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_eq!(data["status"], "pending");
    assert_eq!(data["trip_type"], "one_way");
    assert_eq!(data["base_amount"], 1_600_000);
    assert_eq!(data["final_amount"], 1_600_000);
    assert_eq!(data["allocation_mode"], "auto");

    let held = t
        .store
        .seats(flight.flight.id)
        .await
        .into_iter()
        .filter(|s| !s.is_available)
        .count();
    assert_eq!(held, 1);

    let (status, body) = t.send(Method::GET, "/bookings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_invalid_booking_lists_every_problem() {
    let t = TestApp::new();
    let flight = t.store.seed_flight(FlightFixture::default()).await;
    let body = json!({
        "flight_id": flight.flight.id,
        "passengers": [{ "first_name": "", "last_name": "Nguyen", "passenger_type": "adult" }],
        "contact_info": { "first_name": "Lan", "last_name": "Nguyen", "email": "not-an-email", "phone": "12" }
    });

    let (status, body) = t.send(Method::POST, "/bookings", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["errors"].as_array().unwrap().len() >= 3);
    assert!(t.store.seats(flight.flight.id).await.iter().all(|s| s.is_available));
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let t = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/bookings/price-quote")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = t.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_cancellation_lifecycle_over_http() {
    let t = TestApp::new();
    let flight = t.store.seed_flight(FlightFixture::default()).await;
    let user_id = Uuid::new_v4();
    let customer = t.token(user_id, ROLE_CUSTOMER);
    let admin = t.token(Uuid::new_v4(), ROLE_ADMIN);

    let (_, created) = t
        .send(Method::POST, "/bookings", Some(&customer), Some(booking_body(&flight)))
        .await;
    let booking_id = created["data"]["booking_id"].as_str().unwrap().to_string();
    let reference = created["data"]["booking_reference"].as_str().unwrap().to_string();

    let stranger = t.token(Uuid::new_v4(), ROLE_CUSTOMER);
    let (status, _) = t
        .send(Method::GET, &format!("/bookings/{}", booking_id), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let cancel_uri = format!("/bookings/{}/cancel", booking_id);
    let (status, body) = t
        .send(Method::POST, &cancel_uri, Some(&customer), Some(json!({ "reason": "plans changed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending_cancellation");

    let (status, _) = t
        .send(Method::POST, &cancel_uri, Some(&customer), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status_uri = format!("/admin/bookings/{}/status", booking_id);
    let (status, body) = t
        .send(Method::PATCH, &status_uri, Some(&admin), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert!(t.store.seats(flight.flight.id).await.iter().all(|s| s.is_available));

    let (status, body) = t
        .send(Method::GET, &format!("/bookings/verify/{}", reference.to_lowercase()), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, _) = t
        .send(Method::GET, &format!("/eticket/{}", reference), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_eticket_for_active_booking() {
    let t = TestApp::new();
    let flight = t.store.seed_flight(FlightFixture::default()).await;
    let (_, created) = t.send(Method::POST, "/bookings", None, Some(booking_body(&flight))).await;
    let reference = created["data"]["booking_reference"].as_str().unwrap();

    let (status, body) = t
        .send(Method::GET, &format!("/eticket/{}", reference), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["segments"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["final_amount"], 1_600_000);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let t = TestApp::new();
    let (status, body) = t.send(Method::GET, "/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let customer = t.token(Uuid::new_v4(), ROLE_CUSTOMER);
    let (status, _) = t.send(Method::GET, "/admin/stats", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = t.token(Uuid::new_v4(), ROLE_ADMIN);
    let (status, body) = t.send(Method::GET, "/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_bookings"], 0);

    let (status, _) = t.send(Method::GET, "/admin/stats", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_airline_crud() {
    let t = TestApp::new();
    t.store.seed_flight(FlightFixture::default()).await;
    let admin = t.token(Uuid::new_v4(), ROLE_ADMIN);

    let (status, body) = t
        .send(Method::POST, "/admin/airlines", Some(&admin), Some(json!({ "code": "bl", "name": "Pacific Airlines" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["code"], "BL");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = t
        .send(Method::POST, "/admin/airlines", Some(&admin), Some(json!({ "code": "vn", "name": "Duplicate" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .send(Method::POST, "/admin/airlines", Some(&admin), Some(json!({ "code": "toolong", "name": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);

    let (status, body) = t.send(Method::GET, "/admin/airlines?limit=1", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["total_pages"], 2);

    let uri = format!("/admin/airlines/{}", id);
    let (status, body) = t
        .send(Method::PUT, &uri, Some(&admin), Some(json!({ "code": "BL", "name": "Pacific", "is_active": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = t.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.send(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dev_token_round_trip() {
    let t = TestApp::new();
    let (status, body) = t
        .send(Method::POST, "/auth/dev-token", None, Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = t.send(Method::GET, "/admin/bookings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}
