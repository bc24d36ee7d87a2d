//! Product handlers: staff-only catalog registration, lookup, and sales.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::auth::PrivilegedUser;
use crate::api::dto::{RegisterProductRequest, SellProductRequest};
use crate::app_state::AppState;
use crate::domain::Product;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /products`: Register a new product.
///
/// # Errors
///
/// Returns [`GatewayError`] if the body is invalid or the model exists.
#[utoipa::path(
    post,
    path = "/products",
    tag = "Products",
    summary = "Register a product",
    request_body = RegisterProductRequest,
    responses(
        (status = 201, description = "Product registered", body = Product),
        (status = 401, description = "Not an admin or manager", body = ErrorResponse),
        (status = 409, description = "Model already registered", body = ErrorResponse),
        (status = 422, description = "Malformed body", body = ErrorResponse),
    )
)]
pub async fn register_product(
    State(state): State<AppState>,
    PrivilegedUser(_caller): PrivilegedUser,
    payload: Result<Json<RegisterProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let product = Product::from(req);
    state.product_service.register_product(&product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products/{model}`: Look a product up.
///
/// # Errors
///
/// Returns [`GatewayError::ProductNotFound`] for unknown models.
#[utoipa::path(
    get,
    path = "/products/{model}",
    tag = "Products",
    summary = "Get a product",
    params(("model" = String, Path, description = "Product model")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 401, description = "Not an admin or manager", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    PrivilegedUser(_caller): PrivilegedUser,
    Path(model): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let product = state.product_service.get_product(&model).await?;
    Ok(Json(product))
}

/// `PATCH /products/{model}/sell`: Sell units outside of a cart.
///
/// # Errors
///
/// Returns [`GatewayError`] if the product is unknown or stock is short.
#[utoipa::path(
    patch,
    path = "/products/{model}/sell",
    tag = "Products",
    summary = "Sell product units",
    description = "Decrements stock by `quantity` with the same guarded update checkout uses.",
    params(("model" = String, Path, description = "Product model")),
    request_body = SellProductRequest,
    responses(
        (status = 200, description = "Product with updated stock", body = Product),
        (status = 401, description = "Not an admin or manager", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 409, description = "Insufficient stock", body = ErrorResponse),
        (status = 422, description = "Malformed body", body = ErrorResponse),
    )
)]
pub async fn sell_product(
    State(state): State<AppState>,
    PrivilegedUser(_caller): PrivilegedUser,
    Path(model): Path<String>,
    payload: Result<Json<SellProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let product = state
        .product_service
        .sell_product(&model, req.quantity)
        .await?;
    Ok(Json(product))
}

/// Product routes, relative to the API base path.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(register_product))
        .route("/products/{model}", get(get_product))
        .route("/products/{model}/sell", patch(sell_product))
}
