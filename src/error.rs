//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the single error type returned by the service layer
//! and the handlers. Each variant maps to one HTTP status code and renders
//! as a JSON body of the form:
//!
//! ```json
//! { "error": "Cart not found", "status": 404 }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::persistence::StorageError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// HTTP status code, repeated in the body.
    pub status: u16,
}

/// Server-side error enum with HTTP status code mapping.
///
/// | Variant               | Status |
/// |-----------------------|--------|
/// | `CartNotFound`        | 404    |
/// | `ProductNotInCart`    | 404    |
/// | `ProductNotFound`     | 404    |
/// | `EmptyCart`           | 400    |
/// | `LowProductStock`     | 409    |
/// | `ProductAlreadyExists`| 409    |
/// | `Unauthorized`        | 401    |
/// | `InvalidRequest`      | 422    |
/// | `Contention`          | 503    |
/// | `Storage`             | 500    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The operation needs an open cart and the customer has none.
    #[error("Cart not found")]
    CartNotFound,

    /// Removal targets a model absent from the open cart.
    #[error("Product not in cart")]
    ProductNotInCart,

    /// Checkout attempted on a cart with no line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The referenced model is not in the catalog.
    #[error("Product not found")]
    ProductNotFound,

    /// Requested quantity exceeds available stock.
    #[error("Product stock cannot satisfy the requested quantity")]
    LowProductStock,

    /// A product with the same model is already registered.
    #[error("The product already exists")]
    ProductAlreadyExists,

    /// Missing identity or a role not allowed on the route.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request body or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A cart mutation kept losing compare-and-set races.
    #[error("cart is being modified concurrently, retry later")]
    Contention,

    /// Persistence layer failure.
    #[error("An error occurred while trying to access the database")]
    Storage(#[from] StorageError),
}

impl GatewayError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::CartNotFound | Self::ProductNotInCart | Self::ProductNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::LowProductStock | Self::ProductAlreadyExists => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Contention => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Storage(source) = &self {
            tracing::error!(error = %source, "storage failure");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}
