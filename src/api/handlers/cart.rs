//! Cart handlers: customer cart lifecycle and staff-only listing and reset.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::auth::{CustomerUser, PrivilegedUser};
use crate::api::dto::AddToCartRequest;
use crate::app_state::AppState;
use crate::domain::Cart;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /carts`: Add one unit of a product to the open cart.
///
/// # Errors
///
/// Returns [`GatewayError`] if the product is unknown or out of stock.
#[utoipa::path(
    post,
    path = "/carts",
    tag = "Carts",
    summary = "Add a product to the cart",
    description = "Adds one unit of `model` to the caller's open cart, creating the cart on first use. The line item keeps the product's price and category at the time of the first add.",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Product added"),
        (status = 401, description = "Not a customer", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 409, description = "Insufficient stock", body = ErrorResponse),
        (status = 422, description = "Malformed body", body = ErrorResponse),
    )
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    state.cart_service.add_to_cart(&user, req.model()?).await?;
    Ok(StatusCode::OK)
}

/// `GET /carts`: Current open cart.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/carts",
    tag = "Carts",
    summary = "Get the open cart",
    description = "Returns the caller's open cart, or an empty unpaid cart when none exists.",
    responses(
        (status = 200, description = "Open cart", body = Cart),
        (status = 401, description = "Not a customer", body = ErrorResponse),
    )
)]
pub async fn get_cart(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> Result<impl IntoResponse, GatewayError> {
    let cart = state.cart_service.get_cart(&user).await?;
    Ok(Json(cart))
}

/// `PATCH /carts`: Pay for the open cart.
///
/// # Errors
///
/// Returns [`GatewayError`] if there is no open cart, it is empty, or stock
/// is insufficient.
#[utoipa::path(
    patch,
    path = "/carts",
    tag = "Carts",
    summary = "Check out the open cart",
    description = "Marks the open cart as paid and decrements stock for every line item in one transaction.",
    responses(
        (status = 200, description = "Cart paid"),
        (status = 400, description = "Cart is empty", body = ErrorResponse),
        (status = 401, description = "Not a customer", body = ErrorResponse),
        (status = 404, description = "No open cart or product vanished", body = ErrorResponse),
        (status = 409, description = "Insufficient stock", body = ErrorResponse),
    )
)]
pub async fn checkout_cart(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> Result<impl IntoResponse, GatewayError> {
    state.cart_service.checkout_cart(&user).await?;
    Ok(StatusCode::OK)
}

/// `GET /carts/history`: Paid carts of the caller.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/carts/history",
    tag = "Carts",
    summary = "Purchase history",
    description = "Returns every paid cart of the caller with payment dates as `YYYY-MM-DD`.",
    responses(
        (status = 200, description = "Paid carts", body = Vec<Cart>),
        (status = 401, description = "Not a customer", body = ErrorResponse),
    )
)]
pub async fn get_customer_carts(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> Result<impl IntoResponse, GatewayError> {
    let carts = state.cart_service.get_customer_carts(&user).await?;
    Ok(Json(carts))
}

/// `DELETE /carts/products/{model}`: Remove one unit of a product.
///
/// # Errors
///
/// Returns [`GatewayError`] if there is no open cart or the model is not in it.
#[utoipa::path(
    delete,
    path = "/carts/products/{model}",
    tag = "Carts",
    summary = "Remove a product unit from the cart",
    description = "Decrements the line item's quantity, deleting it when the last unit goes.",
    params(("model" = String, Path, description = "Product model")),
    responses(
        (status = 200, description = "Unit removed"),
        (status = 401, description = "Not a customer", body = ErrorResponse),
        (status = 404, description = "No open cart or product not in cart", body = ErrorResponse),
    )
)]
pub async fn remove_product_from_cart(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(model): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    state
        .cart_service
        .remove_product_from_cart(&user, &model)
        .await?;
    Ok(StatusCode::OK)
}

/// `DELETE /carts/current`: Empty the open cart.
///
/// # Errors
///
/// Returns [`GatewayError`] if there is no open cart.
#[utoipa::path(
    delete,
    path = "/carts/current",
    tag = "Carts",
    summary = "Clear the open cart",
    description = "Removes every line item from the open cart. The cart itself stays open.",
    responses(
        (status = 200, description = "Cart cleared"),
        (status = 401, description = "Not a customer", body = ErrorResponse),
        (status = 404, description = "No open cart", body = ErrorResponse),
    )
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> Result<impl IntoResponse, GatewayError> {
    state.cart_service.clear_cart(&user).await?;
    Ok(StatusCode::OK)
}

/// `GET /carts/all`: Every cart of every customer.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/carts/all",
    tag = "Carts",
    summary = "List all carts",
    description = "Returns open and paid carts of all customers. Payment dates keep their full timestamp.",
    responses(
        (status = 200, description = "All carts", body = Vec<Cart>),
        (status = 401, description = "Not an admin or manager", body = ErrorResponse),
    )
)]
pub async fn get_all_carts(
    State(state): State<AppState>,
    PrivilegedUser(_caller): PrivilegedUser,
) -> Result<impl IntoResponse, GatewayError> {
    let carts = state.cart_service.get_all_carts().await?;
    Ok(Json(carts))
}

/// `DELETE /carts`: Delete every cart.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    delete,
    path = "/carts",
    tag = "Carts",
    summary = "Delete all carts",
    description = "Removes every cart and line item of every customer.",
    responses(
        (status = 200, description = "All carts deleted"),
        (status = 401, description = "Not an admin or manager", body = ErrorResponse),
    )
)]
pub async fn delete_all_carts(
    State(state): State<AppState>,
    PrivilegedUser(admin): PrivilegedUser,
) -> Result<impl IntoResponse, GatewayError> {
    tracing::info!(by = %admin.username, role = %admin.role, "deleting all carts");
    state.cart_service.delete_all_carts().await?;
    Ok(StatusCode::OK)
}

/// Cart routes, relative to the API base path.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/carts",
            post(add_to_cart)
                .get(get_cart)
                .patch(checkout_cart)
                .delete(delete_all_carts),
        )
        .route("/carts/history", get(get_customer_carts))
        .route("/carts/products/{model}", delete(remove_product_from_cart))
        .route("/carts/current", delete(clear_cart))
        .route("/carts/all", get(get_all_carts))
}
