use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use farmlink_order::{DeliveryMode, Order, OrderItem, OrderStatus, PlaceOrder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, middleware::Authenticated, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub status: OrderStatus,
    pub delivery_mode: DeliveryMode,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            price_per_unit: item.price_per_unit,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            buyer_id: order.buyer_id,
            farmer_id: order.farmer_id,
            status: order.status,
            delivery_mode: order.delivery_mode,
            total_amount: order.total_amount,
            created_at: order.created_at,
            updated_at: order.updated_at,
            order_items: order.items.into_iter().map(Into::into).collect(),
        }
    }
}

fn to_responses(orders: Vec<Order>) -> Vec<OrderResponse> {
    orders.into_iter().map(Into::into).collect()
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/buyer/me", get(list_buyer_orders))
        .route("/orders/farmer/me", get(list_farmer_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", put(update_order_status))
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_order(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<PlaceOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let Json(request) = payload?;
    let order = state.orders.create_order(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

async fn get_order(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let Path(id) = id?;
    let order = state.orders.get_order(id, &caller).await?;
    Ok(Json(order.into()))
}

async fn list_buyer_orders(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.orders.list_orders_for_buyer(&caller).await?;
    Ok(Json(to_responses(orders)))
}

async fn list_farmer_orders(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.orders.list_orders_for_farmer(&caller).await?;
    Ok(Json(to_responses(orders)))
}

async fn update_order_status(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let requested: OrderStatus = req.status.parse().map_err(AppError::ValidationError)?;

    let order = state.orders.update_order_status(id, &caller, requested).await?;
    Ok(Json(order.into()))
}
