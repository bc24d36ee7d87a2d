//! Product service: catalog registration, lookup, and manual stock sales.

use std::fmt;
use std::sync::Arc;

use crate::domain::Product;
use crate::error::GatewayError;
use crate::persistence::ProductCatalog;

/// Thin orchestration over a [`ProductCatalog`] for staff-facing routes.
#[derive(Clone)]
pub struct ProductService {
    catalog: Arc<dyn ProductCatalog>,
}

impl fmt::Debug for ProductService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductService").finish_non_exhaustive()
    }
}

impl ProductService {
    /// Creates a new `ProductService`.
    #[must_use]
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { catalog }
    }

    /// Adds a product to the catalog.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] if the model is blank, the price
    ///   is not a positive finite number, or the quantity exceeds
    ///   [`Product::MAX_QUANTITY`].
    /// - [`GatewayError::ProductAlreadyExists`] if the model is taken.
    /// - [`GatewayError::Storage`] on persistence failure.
    pub async fn register_product(&self, product: &Product) -> Result<(), GatewayError> {
        if product.model.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "model must not be empty".to_string(),
            ));
        }
        if !product.selling_price.is_finite() || product.selling_price <= 0.0 {
            return Err(GatewayError::InvalidRequest(
                "sellingPrice must be positive".to_string(),
            ));
        }
        if product.quantity > Product::MAX_QUANTITY {
            return Err(GatewayError::InvalidRequest(format!(
                "quantity must not exceed {}",
                Product::MAX_QUANTITY
            )));
        }

        if !self.catalog.register_product(product).await? {
            return Err(GatewayError::ProductAlreadyExists);
        }
        tracing::info!(
            model = %product.model,
            category = %product.category.as_str(),
            quantity = product.quantity,
            "product registered"
        );
        Ok(())
    }

    /// Looks a product up by model.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ProductNotFound`] if the model is unknown.
    /// - [`GatewayError::Storage`] on persistence failure.
    pub async fn get_product(&self, model: &str) -> Result<Product, GatewayError> {
        self.catalog
            .find_by_model(model)
            .await?
            .ok_or(GatewayError::ProductNotFound)
    }

    /// Sells `quantity` units outside of a cart and returns the product with
    /// its updated stock.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] if `quantity` is zero or exceeds
    ///   [`Product::MAX_QUANTITY`].
    /// - [`GatewayError::ProductNotFound`] if the model is unknown.
    /// - [`GatewayError::LowProductStock`] if stock cannot cover `quantity`.
    /// - [`GatewayError::Storage`] on persistence failure.
    pub async fn sell_product(&self, model: &str, quantity: u32) -> Result<Product, GatewayError> {
        if quantity == 0 || quantity > Product::MAX_QUANTITY {
            return Err(GatewayError::InvalidRequest(format!(
                "quantity must be between 1 and {}",
                Product::MAX_QUANTITY
            )));
        }
        // Distinguish an unknown model from short stock.
        self.get_product(model).await?;

        if !self.catalog.decrement_stock(model, quantity).await? {
            return Err(GatewayError::LowProductStock);
        }
        let product = self.get_product(model).await?;
        tracing::info!(model, sold = quantity, remaining = product.quantity, "product sold");
        Ok(product)
    }
}
