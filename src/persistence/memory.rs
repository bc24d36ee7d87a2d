//! In-memory implementation of the persistence layer.
//!
//! [`MemoryStore`] keeps products, carts, and line items in a single set of
//! tables behind one [`tokio::sync::Mutex`]. Every trait method takes the
//! lock once, so each call is atomic exactly like one SQL transaction.
//! Cloning the store shares the tables.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{CartStore, CloseOutcome, ProductCatalog, StorageError};
use crate::domain::{Cart, PaymentMarker, Product, ProductInCart};

#[derive(Debug, Clone)]
struct StoredCart {
    customer: String,
    marker: PaymentMarker,
}

#[derive(Debug, Clone)]
struct StoredItem {
    customer: String,
    marker: PaymentMarker,
    item: ProductInCart,
}

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<String, Product>,
    carts: Vec<StoredCart>,
    items: Vec<StoredItem>,
}

impl Tables {
    fn has_cart(&self, customer: &str, marker: PaymentMarker) -> bool {
        self.carts
            .iter()
            .any(|c| c.customer == customer && c.marker == marker)
    }

    fn items_of(&self, customer: &str, marker: PaymentMarker) -> Vec<ProductInCart> {
        self.items
            .iter()
            .filter(|i| i.customer == customer && i.marker == marker)
            .map(|i| i.item.clone())
            .collect()
    }

    fn open_item_mut(&mut self, customer: &str, model: &str) -> Option<&mut StoredItem> {
        self.items.iter_mut().find(|i| {
            i.customer == customer && i.marker == PaymentMarker::Open && i.item.model == model
        })
    }

    fn cart(&self, stored: &StoredCart) -> Cart {
        Cart::from_line_items(
            stored.customer.clone(),
            stored.marker,
            self.items_of(&stored.customer, stored.marker),
        )
    }

    fn history(&self, customer: &str) -> Vec<Cart> {
        self.carts
            .iter()
            .filter(|c| c.customer == customer && c.marker.is_paid())
            .map(|c| self.cart(c))
            .collect()
    }
}

/// Mutex-guarded in-memory store implementing [`CartStore`] and
/// [`ProductCatalog`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn has_open_cart(&self, customer: &str) -> Result<bool, StorageError> {
        Ok(self
            .tables
            .lock()
            .await
            .has_cart(customer, PaymentMarker::Open))
    }

    async fn create_open_cart(&self, customer: &str) -> Result<bool, StorageError> {
        let mut tables = self.tables.lock().await;
        if tables.has_cart(customer, PaymentMarker::Open) {
            return Ok(false);
        }
        tables.carts.push(StoredCart {
            customer: customer.to_string(),
            marker: PaymentMarker::Open,
        });
        Ok(true)
    }

    async fn get_open_cart(&self, customer: &str) -> Result<Cart, StorageError> {
        let tables = self.tables.lock().await;
        if !tables.has_cart(customer, PaymentMarker::Open) {
            return Ok(Cart::empty(customer));
        }
        Ok(Cart::from_line_items(
            customer,
            PaymentMarker::Open,
            tables.items_of(customer, PaymentMarker::Open),
        ))
    }

    async fn compute_total(
        &self,
        customer: &str,
        marker: PaymentMarker,
    ) -> Result<f64, StorageError> {
        let tables = self.tables.lock().await;
        Ok(crate::domain::cart::line_items_total(
            &tables.items_of(customer, marker),
        ))
    }

    async fn get_line_item(
        &self,
        customer: &str,
        model: &str,
    ) -> Result<Option<ProductInCart>, StorageError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.open_item_mut(customer, model).map(|i| i.item.clone()))
    }

    async fn insert_line_item(
        &self,
        customer: &str,
        product: &Product,
    ) -> Result<bool, StorageError> {
        let mut tables = self.tables.lock().await;
        if !tables.has_cart(customer, PaymentMarker::Open)
            || tables.open_item_mut(customer, &product.model).is_some()
        {
            return Ok(false);
        }
        tables.items.push(StoredItem {
            customer: customer.to_string(),
            marker: PaymentMarker::Open,
            item: ProductInCart {
                model: product.model.clone(),
                quantity: 1,
                category: product.category,
                price: product.selling_price,
            },
        });
        Ok(true)
    }

    async fn update_line_item_quantity(
        &self,
        customer: &str,
        model: &str,
        expected: u32,
        quantity: u32,
    ) -> Result<bool, StorageError> {
        if quantity == 0 {
            return Err(StorageError::InvalidValue(
                "line item quantity must be positive".to_string(),
            ));
        }
        let mut tables = self.tables.lock().await;
        match tables.open_item_mut(customer, model) {
            Some(stored) if stored.item.quantity == expected => {
                stored.item.quantity = quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_line_item(
        &self,
        customer: &str,
        model: &str,
        expected: u32,
    ) -> Result<bool, StorageError> {
        let mut tables = self.tables.lock().await;
        let before = tables.items.len();
        tables.items.retain(|i| {
            !(i.customer == customer
                && i.marker == PaymentMarker::Open
                && i.item.model == model
                && i.item.quantity == expected)
        });
        Ok(tables.items.len() < before)
    }

    async fn close_cart(
        &self,
        customer: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<CloseOutcome, StorageError> {
        let mut tables = self.tables.lock().await;
        if !tables.has_cart(customer, PaymentMarker::Open) {
            return Ok(CloseOutcome::NoOpenCart);
        }
        let purchased = tables.items_of(customer, PaymentMarker::Open);
        if purchased.is_empty() {
            return Ok(CloseOutcome::EmptyCart);
        }

        // Validate every decrement before applying any of them.
        for line in &purchased {
            match tables.products.get(&line.model) {
                None => {
                    return Ok(CloseOutcome::MissingProduct {
                        model: line.model.clone(),
                    });
                }
                Some(product) if !product.can_supply(line.quantity) => {
                    return Ok(CloseOutcome::InsufficientStock {
                        model: line.model.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        let paid = PaymentMarker::Paid(paid_at);
        if tables.has_cart(customer, paid) {
            return Err(StorageError::InvalidValue(format!(
                "cart for {customer} already closed at {}",
                paid.to_stored()
            )));
        }
        tables.carts.push(StoredCart {
            customer: customer.to_string(),
            marker: paid,
        });
        for line in &purchased {
            if let Some(product) = tables.products.get_mut(&line.model) {
                product.quantity -= line.quantity;
            }
            tables.items.push(StoredItem {
                customer: customer.to_string(),
                marker: paid,
                item: line.clone(),
            });
        }
        tables
            .items
            .retain(|i| !(i.customer == customer && i.marker == PaymentMarker::Open));
        tables
            .carts
            .retain(|c| !(c.customer == customer && c.marker == PaymentMarker::Open));

        Ok(CloseOutcome::Closed(tables.history(customer)))
    }

    async fn purchase_history(&self, customer: &str) -> Result<Vec<Cart>, StorageError> {
        Ok(self.tables.lock().await.history(customer))
    }

    async fn clear_open_cart(&self, customer: &str) -> Result<u64, StorageError> {
        let mut tables = self.tables.lock().await;
        let before = tables.items.len();
        tables
            .items
            .retain(|i| !(i.customer == customer && i.marker == PaymentMarker::Open));
        Ok((before - tables.items.len()) as u64)
    }

    async fn delete_all_carts(&self) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        tables.items.clear();
        tables.carts.clear();
        Ok(())
    }

    async fn all_carts(&self) -> Result<Vec<Cart>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.carts.iter().map(|c| tables.cart(c)).collect())
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn find_by_model(&self, model: &str) -> Result<Option<Product>, StorageError> {
        Ok(self.tables.lock().await.products.get(model).cloned())
    }

    async fn decrement_stock(&self, model: &str, amount: u32) -> Result<bool, StorageError> {
        let mut tables = self.tables.lock().await;
        match tables.products.get_mut(model) {
            Some(product) if product.can_supply(amount) => {
                product.quantity -= amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn register_product(&self, product: &Product) -> Result<bool, StorageError> {
        let mut tables = self.tables.lock().await;
        if tables.products.contains_key(&product.model) {
            return Ok(false);
        }
        tables
            .products
            .insert(product.model.clone(), product.clone());
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::Category;

    fn product(model: &str, price: f64, quantity: u32) -> Product {
        Product {
            model: model.to_string(),
            category: Category::Smartphone,
            selling_price: price,
            quantity,
            details: None,
            arrival_date: None,
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let _ = store.register_product(&product("m1", 50.0, 50)).await;
        let _ = store.register_product(&product("m2", 600.0, 1)).await;
        store
    }

    fn paid_at() -> DateTime<Utc> {
        let Some(at) = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).single() else {
            panic!("valid timestamp");
        };
        at
    }

    #[tokio::test]
    async fn open_cart_is_created_once() {
        let store = MemoryStore::new();
        assert!(matches!(store.create_open_cart("c").await, Ok(true)));
        assert!(matches!(store.create_open_cart("c").await, Ok(false)));
        assert!(matches!(store.has_open_cart("c").await, Ok(true)));
        assert!(matches!(store.has_open_cart("other").await, Ok(false)));
    }

    #[tokio::test]
    async fn insert_requires_open_cart() {
        let store = seeded().await;
        let p = product("m1", 50.0, 50);
        assert!(matches!(store.insert_line_item("c", &p).await, Ok(false)));

        let _ = store.create_open_cart("c").await;
        assert!(matches!(store.insert_line_item("c", &p).await, Ok(true)));
        assert!(matches!(store.insert_line_item("c", &p).await, Ok(false)));
    }

    #[tokio::test]
    async fn quantity_update_is_compare_and_set() {
        let store = seeded().await;
        let _ = store.create_open_cart("c").await;
        let _ = store.insert_line_item("c", &product("m1", 50.0, 50)).await;

        assert!(matches!(
            store.update_line_item_quantity("c", "m1", 1, 2).await,
            Ok(true)
        ));
        // Stale expectation loses.
        assert!(matches!(
            store.update_line_item_quantity("c", "m1", 1, 2).await,
            Ok(false)
        ));
        assert!(matches!(
            store.update_line_item_quantity("c", "m1", 2, 0).await,
            Err(StorageError::InvalidValue(_))
        ));

        let Ok(Some(line)) = store.get_line_item("c", "m1").await else {
            panic!("line item missing");
        };
        assert_eq!(line.quantity, 2);
    }

    #[tokio::test]
    async fn compute_total_uses_snapshot_prices() {
        let store = seeded().await;
        let _ = store.create_open_cart("c").await;
        let _ = store.insert_line_item("c", &product("m1", 50.0, 50)).await;
        let _ = store.update_line_item_quantity("c", "m1", 1, 3).await;

        let Ok(total) = store.compute_total("c", PaymentMarker::Open).await else {
            panic!("total failed");
        };
        assert!((total - 150.0).abs() < f64::EPSILON);

        let Ok(none) = store.compute_total("nobody", PaymentMarker::Open).await else {
            panic!("total failed");
        };
        assert!(none.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn close_cart_migrates_items_and_decrements_stock() {
        let store = seeded().await;
        let _ = store.create_open_cart("c").await;
        let _ = store.insert_line_item("c", &product("m1", 50.0, 50)).await;
        let _ = store.update_line_item_quantity("c", "m1", 1, 2).await;

        let Ok(CloseOutcome::Closed(history)) = store.close_cart("c", paid_at()).await else {
            panic!("checkout failed");
        };
        assert_eq!(history.len(), 1);
        assert!(matches!(store.has_open_cart("c").await, Ok(false)));

        let Ok(Some(stock)) = store.find_by_model("m1").await else {
            panic!("product missing");
        };
        assert_eq!(stock.quantity, 48);

        let Ok(paid_total) = store
            .compute_total("c", PaymentMarker::Paid(paid_at()))
            .await
        else {
            panic!("total failed");
        };
        assert!((paid_total - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn close_cart_is_all_or_nothing() {
        let store = seeded().await;
        let _ = store.create_open_cart("c").await;
        let _ = store.insert_line_item("c", &product("m1", 50.0, 50)).await;
        let _ = store.insert_line_item("c", &product("m2", 600.0, 1)).await;
        let _ = store.update_line_item_quantity("c", "m2", 1, 2).await;

        let outcome = store.close_cart("c", paid_at()).await;
        assert!(matches!(
            outcome,
            Ok(CloseOutcome::InsufficientStock { ref model }) if model == "m2"
        ));

        let Ok(Some(m1)) = store.find_by_model("m1").await else {
            panic!("product missing");
        };
        assert_eq!(m1.quantity, 50);
        let Ok(cart) = store.get_open_cart("c").await else {
            panic!("cart missing");
        };
        assert_eq!(cart.products.len(), 2);
        assert!(matches!(store.purchase_history("c").await, Ok(h) if h.is_empty()));
    }

    #[tokio::test]
    async fn close_cart_reports_missing_and_empty_carts() {
        let store = seeded().await;
        assert!(matches!(
            store.close_cart("c", paid_at()).await,
            Ok(CloseOutcome::NoOpenCart)
        ));
        let _ = store.create_open_cart("c").await;
        assert!(matches!(
            store.close_cart("c", paid_at()).await,
            Ok(CloseOutcome::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn clear_keeps_cart_row() {
        let store = seeded().await;
        let _ = store.create_open_cart("c").await;
        let _ = store.insert_line_item("c", &product("m1", 50.0, 50)).await;

        assert!(matches!(store.clear_open_cart("c").await, Ok(1)));
        assert!(matches!(store.has_open_cart("c").await, Ok(true)));
        let Ok(cart) = store.get_open_cart("c").await else {
            panic!("cart missing");
        };
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn delete_all_removes_everything() {
        let store = seeded().await;
        let _ = store.create_open_cart("a").await;
        let _ = store.create_open_cart("b").await;
        let _ = store.insert_line_item("a", &product("m1", 50.0, 50)).await;

        let Ok(all) = store.all_carts().await else {
            panic!("listing failed");
        };
        assert_eq!(all.len(), 2);

        assert!(store.delete_all_carts().await.is_ok());
        assert!(matches!(store.all_carts().await, Ok(all) if all.is_empty()));
    }

    #[tokio::test]
    async fn decrement_stock_refuses_to_oversell() {
        let store = seeded().await;
        assert!(matches!(store.decrement_stock("m2", 2).await, Ok(false)));
        assert!(matches!(store.decrement_stock("m2", 1).await, Ok(true)));
        assert!(matches!(store.decrement_stock("m2", 1).await, Ok(false)));
        assert!(matches!(store.decrement_stock("ghost", 1).await, Ok(false)));
    }
}
