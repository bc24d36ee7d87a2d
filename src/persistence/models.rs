//! Database row models and their conversion into domain types.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::FromRow;

use super::StorageError;
use crate::domain::{Cart, Category, PaymentMarker, Product, ProductInCart};

/// A row from the `carts` table.
#[derive(Debug, Clone, FromRow)]
pub struct CartRow {
    /// Owning customer.
    pub customer: String,
    /// Stored payment marker (`"X"` or RFC 3339).
    pub payment_date: String,
}

/// A row from the `cart_items` table.
#[derive(Debug, Clone, FromRow)]
pub struct LineItemRow {
    /// Owning customer.
    pub customer: String,
    /// Stored payment marker of the owning cart.
    pub payment_date: String,
    /// Product model.
    pub model: String,
    /// Units in the cart.
    pub quantity: i32,
    /// Category snapshot.
    pub category: String,
    /// Unit price snapshot.
    pub price: f64,
}

/// A row from the `products` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    /// Model identifier.
    pub model: String,
    /// Category name.
    pub category: String,
    /// Selling price.
    pub selling_price: f64,
    /// Stock counter.
    pub quantity: i32,
    /// Description.
    pub details: Option<String>,
    /// Arrival date.
    pub arrival_date: Option<NaiveDate>,
}

impl TryFrom<LineItemRow> for ProductInCart {
    type Error = StorageError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            quantity: stored_count(row.quantity, "cart_items.quantity")?,
            category: row
                .category
                .parse::<Category>()
                .map_err(|e| StorageError::InvalidValue(e.to_string()))?,
            model: row.model,
            price: row.price,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StorageError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            quantity: stored_count(row.quantity, "products.quantity")?,
            category: row
                .category
                .parse::<Category>()
                .map_err(|e| StorageError::InvalidValue(e.to_string()))?,
            model: row.model,
            selling_price: row.selling_price,
            details: row.details,
            arrival_date: row.arrival_date,
        })
    }
}

/// Converts a stored `INTEGER` count into `u32`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidValue`] for negative values.
pub fn stored_count(value: i32, column: &str) -> Result<u32, StorageError> {
    u32::try_from(value)
        .map_err(|_| StorageError::InvalidValue(format!("{column} is negative: {value}")))
}

/// Converts a `u32` count into the `INTEGER` bound into a statement.
///
/// # Errors
///
/// Returns [`StorageError::InvalidValue`] if `value` exceeds `i32::MAX`.
pub fn bound_count(value: u32) -> Result<i32, StorageError> {
    i32::try_from(value)
        .map_err(|_| StorageError::InvalidValue(format!("count too large: {value}")))
}

/// Groups line items under their carts, preserving the order of `carts`
/// and of `items` within each cart. Totals are derived from the items.
///
/// # Errors
///
/// Returns [`StorageError::InvalidValue`] if any row fails to decode.
pub fn assemble_carts(
    carts: Vec<CartRow>,
    items: Vec<LineItemRow>,
) -> Result<Vec<Cart>, StorageError> {
    let mut grouped: HashMap<(String, String), Vec<ProductInCart>> = HashMap::new();
    for row in items {
        let key = (row.customer.clone(), row.payment_date.clone());
        grouped.entry(key).or_default().push(row.try_into()?);
    }

    carts
        .into_iter()
        .map(|row| {
            let marker = PaymentMarker::from_stored(&row.payment_date)
                .map_err(|e| StorageError::InvalidValue(e.to_string()))?;
            let products = grouped
                .remove(&(row.customer.clone(), row.payment_date))
                .unwrap_or_default();
            Ok(Cart::from_line_items(row.customer, marker, products))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn item_row(customer: &str, payment_date: &str, model: &str, quantity: i32) -> LineItemRow {
        LineItemRow {
            customer: customer.to_string(),
            payment_date: payment_date.to_string(),
            model: model.to_string(),
            quantity,
            category: "Laptop".to_string(),
            price: 100.0,
        }
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let result = ProductInCart::try_from(item_row("c", "X", "m", -1));
        assert!(matches!(result, Err(StorageError::InvalidValue(_))));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut row = item_row("c", "X", "m", 1);
        row.category = "Tablet".to_string();
        assert!(ProductInCart::try_from(row).is_err());
    }

    #[test]
    fn bound_count_rejects_overflow() {
        assert!(bound_count(u32::MAX).is_err());
        assert_eq!(bound_count(7).ok(), Some(7));
    }

    #[test]
    fn assemble_groups_items_per_cart() {
        let paid = "2024-06-01T10:00:00.000000Z";
        let carts = vec![
            CartRow {
                customer: "alice".to_string(),
                payment_date: paid.to_string(),
            },
            CartRow {
                customer: "alice".to_string(),
                payment_date: "X".to_string(),
            },
            CartRow {
                customer: "bob".to_string(),
                payment_date: "X".to_string(),
            },
        ];
        let items = vec![
            item_row("alice", "X", "m1", 2),
            item_row("alice", paid, "m2", 1),
            item_row("alice", "X", "m3", 1),
        ];

        let Ok(assembled) = assemble_carts(carts, items) else {
            panic!("assembly failed");
        };
        assert_eq!(assembled.len(), 3);

        let Some(history) = assembled.first() else {
            panic!("missing paid cart");
        };
        assert!(history.paid);
        assert_eq!(history.products.len(), 1);

        let Some(open) = assembled.get(1) else {
            panic!("missing open cart");
        };
        assert!(!open.paid);
        assert_eq!(open.payment_date, None);
        let models: Vec<&str> = open.products.iter().map(|p| p.model.as_str()).collect();
        assert_eq!(models, ["m1", "m3"]);
        assert!((open.total - 300.0).abs() < f64::EPSILON);

        let Some(bob) = assembled.get(2) else {
            panic!("missing bob's cart");
        };
        assert!(bob.is_empty());
    }
}
