//! Cart service: business rules for the cart lifecycle and checkout.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::{Cart, User};
use crate::error::GatewayError;
use crate::persistence::{CartStore, CloseOutcome, ProductCatalog};

/// Orchestration layer for every cart operation.
///
/// Stateless coordinator over a [`CartStore`] and a [`ProductCatalog`]: it
/// checks preconditions, translates store state into domain errors, and
/// drives line-item mutations through compare-and-set retries. Mutations
/// follow the pattern: read → decide → conditional write → re-read on a
/// lost race.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    catalog: Arc<dyn ProductCatalog>,
    max_attempts: u32,
}

impl fmt::Debug for CartService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartService")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl CartService {
    /// Creates a new `CartService`. `max_attempts` bounds the retries of a
    /// single add or remove and is clamped to at least 1.
    #[must_use]
    pub fn new(
        store: Arc<dyn CartStore>,
        catalog: Arc<dyn ProductCatalog>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            catalog,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Adds one unit of `model` to the user's open cart, creating the cart
    /// on first use.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ProductNotFound`] if the model is not in the catalog.
    /// - [`GatewayError::LowProductStock`] if the product is out of stock or
    ///   the cart already holds every available unit.
    /// - [`GatewayError::Contention`] if the retry budget runs out.
    /// - [`GatewayError::Storage`] on persistence failure.
    pub async fn add_to_cart(&self, user: &User, model: &str) -> Result<(), GatewayError> {
        let customer = user.username.as_str();
        let product = self
            .catalog
            .find_by_model(model)
            .await?
            .ok_or(GatewayError::ProductNotFound)?;

        if product.quantity == 0 {
            return Err(GatewayError::LowProductStock);
        }

        for attempt in 1..=self.max_attempts {
            if !self.store.has_open_cart(customer).await?
                && self.store.create_open_cart(customer).await?
            {
                tracing::info!(customer, "open cart created");
            }

            let applied = match self.store.get_line_item(customer, model).await? {
                None => self.store.insert_line_item(customer, &product).await?,
                Some(line) => {
                    let wanted = line.quantity.saturating_add(1);
                    if !product.can_supply(wanted) {
                        return Err(GatewayError::LowProductStock);
                    }
                    self.store
                        .update_line_item_quantity(customer, model, line.quantity, wanted)
                        .await?
                }
            };

            if applied {
                return Ok(());
            }
            tracing::debug!(customer, model, attempt, "add lost a race, retrying");
        }

        Err(GatewayError::Contention)
    }

    /// Returns the user's open cart, or an empty cart if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] on persistence failure.
    pub async fn get_cart(&self, user: &User) -> Result<Cart, GatewayError> {
        Ok(self.store.get_open_cart(&user.username).await?)
    }

    /// Removes one unit of `model` from the open cart, deleting the line
    /// item when its last unit goes.
    ///
    /// The model does not need to exist in the catalog.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::CartNotFound`] if the user has no open cart.
    /// - [`GatewayError::ProductNotInCart`] if the cart has no such line item.
    /// - [`GatewayError::Contention`] if the retry budget runs out.
    /// - [`GatewayError::Storage`] on persistence failure.
    pub async fn remove_product_from_cart(
        &self,
        user: &User,
        model: &str,
    ) -> Result<(), GatewayError> {
        let customer = user.username.as_str();
        if !self.store.has_open_cart(customer).await? {
            return Err(GatewayError::CartNotFound);
        }

        for attempt in 1..=self.max_attempts {
            let Some(line) = self.store.get_line_item(customer, model).await? else {
                // The cart may have been checked out since the first check.
                if !self.store.has_open_cart(customer).await? {
                    return Err(GatewayError::CartNotFound);
                }
                return Err(GatewayError::ProductNotInCart);
            };

            let applied = if line.quantity > 1 {
                self.store
                    .update_line_item_quantity(customer, model, line.quantity, line.quantity - 1)
                    .await?
            } else {
                self.store
                    .delete_line_item(customer, model, line.quantity)
                    .await?
            };

            if applied {
                return Ok(());
            }
            tracing::debug!(customer, model, attempt, "remove lost a race, retrying");
        }

        Err(GatewayError::Contention)
    }

    /// Pays for the open cart: every line item moves into a new paid cart
    /// and product stock is decremented, all or nothing.
    ///
    /// Prices are the ones snapshotted when each line item was added; only
    /// stock is re-checked here.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::CartNotFound`] if the user has no open cart.
    /// - [`GatewayError::EmptyCart`] if the open cart has no line items.
    /// - [`GatewayError::ProductNotFound`] if a line item's model left the catalog.
    /// - [`GatewayError::LowProductStock`] if stock cannot cover a line item.
    /// - [`GatewayError::Storage`] on persistence failure.
    pub async fn checkout_cart(&self, user: &User) -> Result<(), GatewayError> {
        let customer = user.username.as_str();
        if !self.store.has_open_cart(customer).await? {
            return Err(GatewayError::CartNotFound);
        }

        let cart = self.store.get_open_cart(customer).await?;
        if cart.is_empty() {
            return Err(GatewayError::EmptyCart);
        }

        for line in &cart.products {
            let product = self
                .catalog
                .find_by_model(&line.model)
                .await?
                .ok_or(GatewayError::ProductNotFound)?;
            if !product.can_supply(line.quantity) {
                return Err(GatewayError::LowProductStock);
            }
        }

        match self.store.close_cart(customer, Utc::now()).await? {
            CloseOutcome::Closed(history) => {
                tracing::info!(
                    customer,
                    items = cart.products.len(),
                    total = cart.total,
                    paid_carts = history.len(),
                    "cart checked out"
                );
                Ok(())
            }
            CloseOutcome::NoOpenCart => Err(GatewayError::CartNotFound),
            CloseOutcome::EmptyCart => Err(GatewayError::EmptyCart),
            CloseOutcome::MissingProduct { model } => {
                tracing::warn!(customer, model, "product vanished during checkout");
                Err(GatewayError::ProductNotFound)
            }
            CloseOutcome::InsufficientStock { model } => {
                tracing::warn!(customer, model, "checkout lost a stock race");
                Err(GatewayError::LowProductStock)
            }
        }
    }

    /// Returns the user's paid carts with payment dates shortened to
    /// `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] on persistence failure.
    pub async fn get_customer_carts(&self, user: &User) -> Result<Vec<Cart>, GatewayError> {
        let history = self.store.purchase_history(&user.username).await?;
        Ok(history
            .into_iter()
            .map(Cart::with_short_payment_date)
            .collect())
    }

    /// Empties the open cart, keeping the cart itself.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::CartNotFound`] if the user has no open cart.
    /// - [`GatewayError::Storage`] on persistence failure.
    pub async fn clear_cart(&self, user: &User) -> Result<(), GatewayError> {
        let customer = user.username.as_str();
        if !self.store.has_open_cart(customer).await? {
            return Err(GatewayError::CartNotFound);
        }
        let removed = self.store.clear_open_cart(customer).await?;
        tracing::debug!(customer, removed, "open cart cleared");
        Ok(())
    }

    /// Deletes every cart of every customer.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] on persistence failure.
    pub async fn delete_all_carts(&self) -> Result<(), GatewayError> {
        self.store.delete_all_carts().await?;
        tracing::info!("all carts deleted");
        Ok(())
    }

    /// Returns every cart of every customer.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] on persistence failure.
    pub async fn get_all_carts(&self) -> Result<Vec<Cart>, GatewayError> {
        Ok(self.store.all_carts().await?)
    }
}
