use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use farmlink_catalog::{NewProduct, Product, ProductFilter, ProductStatus, ProductUpdate};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::AppError, middleware::Authenticated, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub quantity: Option<Decimal>,
    pub price_per_unit: Option<Decimal>,
    pub status: Option<String>,
}

impl UpdateProductRequest {
    fn into_update(self) -> Result<ProductUpdate, AppError> {
        let status = self
            .status
            .map(|s| s.parse::<ProductStatus>())
            .transpose()
            .map_err(|_| AppError::ValidationError("Status must be one of: active, closed, sold".into()))?;

        Ok(ProductUpdate {
            quantity: self.quantity,
            price_per_unit: self.price_per_unit,
            status,
        })
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/me", get(list_my_products))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_products(
    State(state): State<AppState>,
    filter: Result<Query<ProductFilter>, QueryRejection>,
) -> Result<Json<Vec<Product>>, AppError> {
    let Query(filter) = filter?;
    Ok(Json(state.products.list(&filter).await?))
}

async fn get_product(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Product>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.products.get(id).await?))
}

async fn list_my_products(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products.list_mine(&caller).await?))
}

async fn create_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let Json(fields) = payload?;
    let product = state.products.create(&caller, fields).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<Product>, AppError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let product = state.products.update(&caller, id, req.into_update()?).await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    state.products.delete(&caller, id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
