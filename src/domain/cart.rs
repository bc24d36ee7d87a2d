//! Cart aggregate: open carts, paid carts, and their line items.
//!
//! A customer owns at most one open cart at a time, identified by the
//! [`PaymentMarker::Open`] sentinel. Checkout turns the open cart into a
//! paid cart stamped with the payment time; paid carts are never mutated
//! again and form the purchase history.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Category;

/// Stored sentinel for the open cart's payment date.
pub const OPEN_CART_MARKER: &str = "X";

/// Payment state of a cart, as persisted in the `payment_date` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMarker {
    /// Unpaid cart; stored as [`OPEN_CART_MARKER`].
    Open,
    /// Cart closed at checkout at the given instant.
    Paid(DateTime<Utc>),
}

/// Error returned when a stored payment date is neither the sentinel nor
/// an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid payment date: {0}")]
pub struct InvalidPaymentDate(pub String);

impl PaymentMarker {
    /// Returns the value stored in the `payment_date` column.
    #[must_use]
    pub fn to_stored(self) -> String {
        match self {
            Self::Open => OPEN_CART_MARKER.to_string(),
            Self::Paid(at) => at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    /// Parses a stored `payment_date` value.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPaymentDate`] if the value is not the sentinel and
    /// cannot be parsed as RFC 3339.
    pub fn from_stored(value: &str) -> Result<Self, InvalidPaymentDate> {
        if value == OPEN_CART_MARKER {
            return Ok(Self::Open);
        }
        DateTime::parse_from_rfc3339(value)
            .map(|at| Self::Paid(at.with_timezone(&Utc)))
            .map_err(|_| InvalidPaymentDate(value.to_string()))
    }

    /// Returns `true` for paid carts.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid(_))
    }

    /// External representation: `None` for the open cart, the full
    /// timestamp otherwise.
    #[must_use]
    pub fn external(self) -> Option<String> {
        match self {
            Self::Open => None,
            Self::Paid(_) => Some(self.to_stored()),
        }
    }
}

/// A line item: one product model with a quantity and a price snapshot.
///
/// `category` and `price` are copied from the catalog when the line item
/// is created, so a paid cart keeps the price actually charged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductInCart {
    /// Referenced product model.
    pub model: String,
    /// Units requested.
    pub quantity: u32,
    /// Category snapshot.
    pub category: Category,
    /// Unit price snapshot.
    pub price: f64,
}

impl ProductInCart {
    /// Returns `quantity × price`.
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }
}

/// Sums `quantity × price` over a set of line items.
#[must_use]
pub fn line_items_total(products: &[ProductInCart]) -> f64 {
    products.iter().map(ProductInCart::subtotal).sum()
}

/// A cart as returned to callers.
///
/// `total` is always derived from `products`, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Owning customer.
    pub customer: String,
    /// `false` for the open cart.
    pub paid: bool,
    /// `None` while open; payment timestamp once paid.
    pub payment_date: Option<String>,
    /// Sum of `quantity × price` over `products`.
    pub total: f64,
    /// Line items in insertion order.
    pub products: Vec<ProductInCart>,
}

impl Cart {
    /// The value returned when a customer has no open cart.
    #[must_use]
    pub fn empty(customer: impl Into<String>) -> Self {
        Self {
            customer: customer.into(),
            paid: false,
            payment_date: None,
            total: 0.0,
            products: Vec::new(),
        }
    }

    /// Builds a cart from its line items, deriving `total`.
    #[must_use]
    pub fn from_line_items(
        customer: impl Into<String>,
        marker: PaymentMarker,
        products: Vec<ProductInCart>,
    ) -> Self {
        Self {
            customer: customer.into(),
            paid: marker.is_paid(),
            payment_date: marker.external(),
            total: line_items_total(&products),
            products,
        }
    }

    /// Returns the line item for `model`, if present.
    #[must_use]
    pub fn line_item(&self, model: &str) -> Option<&ProductInCart> {
        self.products.iter().find(|p| p.model == model)
    }

    /// Returns `true` if the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Truncates `payment_date` to its `YYYY-MM-DD` form.
    #[must_use]
    pub fn with_short_payment_date(mut self) -> Self {
        self.payment_date = self.payment_date.map(|raw| short_date(&raw));
        self
    }
}

fn short_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.chars().take(10).collect(),
        |at| at.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
    )
}
