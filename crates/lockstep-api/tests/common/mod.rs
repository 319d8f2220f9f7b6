//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use lockstep_core::clock::Clock;
use lockstep_core::event_log::EventLog;
use lockstep_event_store::in_memory_event_log::InMemoryEventLog;
use lockstep_event_store::pg_event_log::PgEventLog;
use lockstep_orders::application::service::OrderService;
use lockstep_test_support::FixedClock;
use sqlx::PgPool;
use tower::ServiceExt;

use lockstep_api::routes;
use lockstep_api::state::{AppState, LogBackend};

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router over `log` with a deterministic clock. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app(log: Arc<dyn EventLog>, backend: LogBackend) -> Router {
    let app_state = AppState::new(OrderService::new(fixed_clock(), log), backend);
    routes::router().with_state(app_state)
}

/// Build the app over a fresh in-memory log.
pub fn build_in_memory_app() -> Router {
    build_test_app(Arc::new(InMemoryEventLog::new()), LogBackend::InMemory)
}

/// Build the app over a `PgEventLog` on `pool`.
pub fn build_pg_app(pool: PgPool) -> Router {
    build_test_app(Arc::new(PgEventLog::new(pool)), LogBackend::Postgres)
}

/// Send a request with an optional JSON body and return the response.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Extractor rejections answer in plain text.
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body_bytes).into_owned())
        })
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, Method::POST, uri, Some(body)).await
}

/// Send a PUT request with a JSON body and return the response.
pub async fn put_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, Method::PUT, uri, Some(body)).await
}

/// Send a bodiless POST request and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Method::POST, uri, None).await
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Method::DELETE, uri, None).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Method::GET, uri, None).await
}

/// Create an order and return its id.
pub async fn create_order(app: &Router) -> uuid::Uuid {
    let (status, json) = post_json(app.clone(), "/api/v1/orders", &serde_json::json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    json["order_id"].as_str().unwrap().parse().unwrap()
}
