//! Cart request bodies.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Request body for `POST /carts`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    /// Model of the product to add one unit of.
    pub model: String,
}

impl AddToCartRequest {
    /// Returns the trimmed model, rejecting blank values.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `model` is blank.
    pub fn model(&self) -> Result<&str, GatewayError> {
        let model = self.model.trim();
        if model.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "model must not be empty".to_string(),
            ));
        }
        Ok(model)
    }
}
