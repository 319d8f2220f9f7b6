//! Routes for the Order bounded context.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use lockstep_orders::application::query_handlers::OrderView;
use lockstep_orders::domain::aggregates::OrderStatus;
use lockstep_orders::domain::commands::{
    AddItem, CancelOrder, CreateOrder, RecalculateTotal, RemoveItem, SetStatus, UpdateTotal,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ApiError, outcome_response};
use crate::state::AppState;

/// Header carrying the caller's correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Body of `POST /api/v1/orders`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    /// Identifier to use; a fresh one is generated when absent.
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

/// Body of `POST /api/v1/orders/{order_id}/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    /// Item identifier, unique within the order.
    pub item_id: Uuid,
    /// Display name.
    pub name: String,
    /// Unit price, as a decimal string.
    pub price: Decimal,
}

/// Body of `PUT /api/v1/orders/{order_id}/total`.
#[derive(Debug, Deserialize)]
pub struct UpdateTotalRequest {
    /// The new total, as a decimal string.
    pub total: Decimal,
}

/// Body of `PUT /api/v1/orders/{order_id}/status`.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// Target status: `closed` or `cancelled`.
    pub status: OrderStatus,
}

/// Body of `POST /api/v1/orders/{order_id}/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    /// Why the order is cancelled.
    pub reason: String,
}

/// Uses the caller's correlation id when it sent a valid one.
fn correlation_id(headers: &HeaderMap) -> Uuid {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .unwrap_or_else(Uuid::new_v4)
}

/// POST /api/v1/orders
#[instrument(skip_all)]
async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Response, ApiError> {
    let command = CreateOrder {
        correlation_id: correlation_id(&headers),
        order_id: body.order_id.unwrap_or_else(Uuid::new_v4),
    };
    let outcome = state.orders.create_order(&command).await?;
    Ok(outcome_response(outcome, StatusCode::CREATED))
}

/// POST /api/v1/orders/{order_id}/items
#[instrument(skip(state, headers, body))]
async fn add_item(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AddItemRequest>,
) -> Result<Response, ApiError> {
    let command = AddItem {
        correlation_id: correlation_id(&headers),
        order_id,
        item_id: body.item_id,
        name: body.name,
        price: body.price,
    };
    let outcome = state.orders.add_item(&command).await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

/// DELETE /api/v1/orders/{order_id}/items/{item_id}
#[instrument(skip(state, headers))]
async fn remove_item(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let command = RemoveItem {
        correlation_id: correlation_id(&headers),
        order_id,
        item_id,
    };
    let outcome = state.orders.remove_item(&command).await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

/// PUT /api/v1/orders/{order_id}/total
#[instrument(skip(state, headers, body))]
async fn update_total(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<UpdateTotalRequest>,
) -> Result<Response, ApiError> {
    let command = UpdateTotal {
        correlation_id: correlation_id(&headers),
        order_id,
        total: body.total,
    };
    let outcome = state.orders.update_total(&command).await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

/// POST /api/v1/orders/{order_id}/recalculate
#[instrument(skip(state, headers))]
async fn recalculate_total(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let command = RecalculateTotal {
        correlation_id: correlation_id(&headers),
        order_id,
    };
    let outcome = state.orders.recalculate_total(&command).await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

/// PUT /api/v1/orders/{order_id}/status
#[instrument(skip(state, headers, body))]
async fn set_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<SetStatusRequest>,
) -> Result<Response, ApiError> {
    let command = SetStatus {
        correlation_id: correlation_id(&headers),
        order_id,
        status: body.status,
    };
    let outcome = state.orders.set_status(&command).await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

/// POST /api/v1/orders/{order_id}/cancel
#[instrument(skip(state, headers, body))]
async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CancelOrderRequest>,
) -> Result<Response, ApiError> {
    let command = CancelOrder {
        correlation_id: correlation_id(&headers),
        order_id,
        reason: body.reason,
    };
    let outcome = state.orders.cancel_order(&command).await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

/// GET /api/v1/orders/{order_id}
#[instrument(skip(state))]
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(state.orders.get_order(order_id).await?))
}

/// POST /api/v1/orders/{order_id}/recover
#[instrument(skip(state))]
async fn recover_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(state.orders.recover(order_id).await?))
}

/// Returns the router for the order context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/{order_id}", get(get_order))
        .route("/{order_id}/items", post(add_item))
        .route("/{order_id}/items/{item_id}", delete(remove_item))
        .route("/{order_id}/total", put(update_total))
        .route("/{order_id}/recalculate", post(recalculate_total))
        .route("/{order_id}/status", put(set_status))
        .route("/{order_id}/cancel", post(cancel_order))
        .route("/{order_id}/recover", post(recover_order))
}
