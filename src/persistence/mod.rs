//! Persistence layer: cart store and product catalog.
//!
//! [`CartStore`] owns carts and line items and exposes primitive reads and
//! writes with no business validation. [`ProductCatalog`] is the narrow
//! product-lookup and stock-mutation contract the cart core depends on.
//!
//! Two backends implement both traits with the same semantics:
//! [`postgres`] (`sqlx::PgPool`) and [`memory`] (a mutex-guarded set of
//! tables used when persistence is disabled and in tests).
//!
//! Line-item mutations are compare-and-set: they report whether the row
//! changed and never overwrite a value they did not read.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::domain::{Cart, PaymentMarker, Product, ProductInCart};

pub use memory::MemoryStore;
pub use postgres::{PgCartStore, PgProductCatalog};

/// Storage failure. The store never reports domain errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The database rejected or failed a statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations could not be applied.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored or bound value is outside the domain's range.
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

/// Result of the checkout primitive [`CartStore::close_cart`].
///
/// Every variant except [`CloseOutcome::Closed`] means the transaction was
/// rolled back and nothing changed.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// The open cart was migrated into a new paid cart. Carries the
    /// customer's full purchase history including the new cart.
    Closed(Vec<Cart>),
    /// The customer has no open cart.
    NoOpenCart,
    /// The open cart has no line items.
    EmptyCart,
    /// A line item references a model that is no longer in the catalog.
    MissingProduct {
        /// Offending model.
        model: String,
    },
    /// Stock for a model dropped below the quantity being purchased.
    InsufficientStock {
        /// Offending model.
        model: String,
    },
}

/// Durable storage for carts and their line items.
///
/// All line-item operations target the customer's open cart.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns `true` iff an open cart exists for `customer`.
    async fn has_open_cart(&self, customer: &str) -> Result<bool, StorageError>;

    /// Inserts an open cart row. Returns `false` if one already existed.
    async fn create_open_cart(&self, customer: &str) -> Result<bool, StorageError>;

    /// Returns the open cart with line items and total, or
    /// [`Cart::empty`] if there is none.
    async fn get_open_cart(&self, customer: &str) -> Result<Cart, StorageError>;

    /// Sums `quantity × price` over the line items of the cart identified by
    /// `(customer, marker)`. Returns `0.0` when there are none.
    async fn compute_total(
        &self,
        customer: &str,
        marker: PaymentMarker,
    ) -> Result<f64, StorageError>;

    /// Reads one line item of the open cart.
    async fn get_line_item(
        &self,
        customer: &str,
        model: &str,
    ) -> Result<Option<ProductInCart>, StorageError>;

    /// Inserts a line item at quantity 1, snapshotting the product's
    /// category and price. Returns `false` if the line item already exists
    /// or the open cart disappeared.
    async fn insert_line_item(
        &self,
        customer: &str,
        product: &Product,
    ) -> Result<bool, StorageError>;

    /// Sets a line item's quantity to `quantity` if it currently equals
    /// `expected`. Returns `false` when the row did not match.
    async fn update_line_item_quantity(
        &self,
        customer: &str,
        model: &str,
        expected: u32,
        quantity: u32,
    ) -> Result<bool, StorageError>;

    /// Deletes a line item if its quantity currently equals `expected`.
    /// Returns `false` when the row did not match.
    async fn delete_line_item(
        &self,
        customer: &str,
        model: &str,
        expected: u32,
    ) -> Result<bool, StorageError>;

    /// Checkout primitive, applied atomically: creates a paid cart stamped
    /// `paid_at`, copies every open line item into it, decrements each
    /// product's stock by the purchased quantity, and deletes the open
    /// cart and its line items.
    async fn close_cart(
        &self,
        customer: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<CloseOutcome, StorageError>;

    /// Returns every paid cart of `customer`, oldest first.
    async fn purchase_history(&self, customer: &str) -> Result<Vec<Cart>, StorageError>;

    /// Deletes every line item of the open cart, keeping the cart row.
    /// Returns the number of line items removed.
    async fn clear_open_cart(&self, customer: &str) -> Result<u64, StorageError>;

    /// Deletes every cart and line item.
    async fn delete_all_carts(&self) -> Result<(), StorageError>;

    /// Returns every cart of every customer, open and paid.
    async fn all_carts(&self) -> Result<Vec<Cart>, StorageError>;
}

/// Product lookup and stock mutation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks a product up by model.
    async fn find_by_model(&self, model: &str) -> Result<Option<Product>, StorageError>;

    /// Decrements stock by `amount` if at least `amount` units are
    /// available. Returns `false` when the product is missing or short.
    async fn decrement_stock(&self, model: &str, amount: u32) -> Result<bool, StorageError>;

    /// Adds a product. Returns `false` if the model already exists.
    async fn register_product(&self, product: &Product) -> Result<bool, StorageError>;
}
