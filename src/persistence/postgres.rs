//! PostgreSQL implementation of the persistence layer.
//!
//! Every statement binds its values; nothing is interpolated into SQL text.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{CartRow, LineItemRow, ProductRow, assemble_carts, bound_count};
use super::{CartStore, CloseOutcome, ProductCatalog, StorageError};
use crate::config::ServiceConfig;
use crate::domain::{Cart, PaymentMarker, Product, ProductInCart};

const SELECT_ITEMS_OF_CART: &str = "SELECT customer, payment_date, model, quantity, category, price \
     FROM cart_items WHERE customer = $1 AND payment_date = $2 ORDER BY id";

const SUM_OF_CART: &str = "SELECT COALESCE(SUM(quantity * price), 0)::DOUBLE PRECISION \
     FROM cart_items WHERE customer = $1 AND payment_date = $2";

const HAS_CART: &str = "SELECT EXISTS (SELECT 1 FROM carts WHERE customer = $1 AND payment_date = $2)";

/// Opens a connection pool sized from `config`.
///
/// # Errors
///
/// Returns a [`StorageError::Database`] if the database is unreachable.
pub async fn connect(config: &ServiceConfig) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Applies the embedded migrations under `migrations/`.
///
/// # Errors
///
/// Returns a [`StorageError::Migration`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed cart store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Creates a new cart store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn has_open_cart(&self, customer: &str) -> Result<bool, StorageError> {
        let exists = sqlx::query_scalar::<_, bool>(HAS_CART)
            .bind(customer)
            .bind(PaymentMarker::Open.to_stored())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn create_open_cart(&self, customer: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO carts (customer, paid, payment_date) VALUES ($1, FALSE, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(customer)
        .bind(PaymentMarker::Open.to_stored())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_open_cart(&self, customer: &str) -> Result<Cart, StorageError> {
        let open = PaymentMarker::Open.to_stored();

        // Existence, items and total are read from one snapshot so the total
        // always belongs to the items returned.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let exists = sqlx::query_scalar::<_, bool>(HAS_CART)
            .bind(customer)
            .bind(&open)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            tx.commit().await?;
            return Ok(Cart::empty(customer));
        }

        let rows = sqlx::query_as::<_, LineItemRow>(SELECT_ITEMS_OF_CART)
            .bind(customer)
            .bind(&open)
            .fetch_all(&mut *tx)
            .await?;
        let total = sqlx::query_scalar::<_, f64>(SUM_OF_CART)
            .bind(customer)
            .bind(&open)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        let products = rows
            .into_iter()
            .map(ProductInCart::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let mut cart = Cart::from_line_items(customer, PaymentMarker::Open, products);
        cart.total = total;
        Ok(cart)
    }

    async fn compute_total(
        &self,
        customer: &str,
        marker: PaymentMarker,
    ) -> Result<f64, StorageError> {
        let total = sqlx::query_scalar::<_, f64>(SUM_OF_CART)
            .bind(customer)
            .bind(marker.to_stored())
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    async fn get_line_item(
        &self,
        customer: &str,
        model: &str,
    ) -> Result<Option<ProductInCart>, StorageError> {
        let row = sqlx::query_as::<_, LineItemRow>(
            "SELECT customer, payment_date, model, quantity, category, price \
             FROM cart_items WHERE customer = $1 AND model = $2 AND payment_date = $3",
        )
        .bind(customer)
        .bind(model)
        .bind(PaymentMarker::Open.to_stored())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductInCart::try_from).transpose()
    }

    async fn insert_line_item(
        &self,
        customer: &str,
        product: &Product,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO cart_items (customer, model, payment_date, quantity, category, price) \
             SELECT $1, $2, $3, 1, $4, $5 \
             WHERE EXISTS (SELECT 1 FROM carts WHERE customer = $1 AND payment_date = $3) \
             ON CONFLICT (customer, model, payment_date) DO NOTHING",
        )
        .bind(customer)
        .bind(&product.model)
        .bind(PaymentMarker::Open.to_stored())
        .bind(product.category.as_str())
        .bind(product.selling_price)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            // The open cart was closed by a concurrent checkout after our
            // existence check.
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_line_item_quantity(
        &self,
        customer: &str,
        model: &str,
        expected: u32,
        quantity: u32,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $4 \
             WHERE customer = $1 AND model = $2 AND payment_date = $5 AND quantity = $3",
        )
        .bind(customer)
        .bind(model)
        .bind(bound_count(expected)?)
        .bind(bound_count(quantity)?)
        .bind(PaymentMarker::Open.to_stored())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_line_item(
        &self,
        customer: &str,
        model: &str,
        expected: u32,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "DELETE FROM cart_items \
             WHERE customer = $1 AND model = $2 AND payment_date = $4 AND quantity = $3",
        )
        .bind(customer)
        .bind(model)
        .bind(bound_count(expected)?)
        .bind(PaymentMarker::Open.to_stored())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn close_cart(
        &self,
        customer: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<CloseOutcome, StorageError> {
        let open = PaymentMarker::Open.to_stored();
        let paid = PaymentMarker::Paid(paid_at).to_stored();

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM carts WHERE customer = $1 AND payment_date = $2 FOR UPDATE",
        )
        .bind(customer)
        .bind(&open)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(CloseOutcome::NoOpenCart);
        }

        // Sorted by model so concurrent checkouts lock products in the same order.
        let purchased = sqlx::query_as::<_, (String, i32)>(
            "SELECT model, quantity FROM cart_items \
             WHERE customer = $1 AND payment_date = $2 ORDER BY model FOR UPDATE",
        )
        .bind(customer)
        .bind(&open)
        .fetch_all(&mut *tx)
        .await?;
        if purchased.is_empty() {
            tx.rollback().await?;
            return Ok(CloseOutcome::EmptyCart);
        }

        sqlx::query("INSERT INTO carts (customer, paid, payment_date) VALUES ($1, TRUE, $2)")
            .bind(customer)
            .bind(&paid)
            .execute(&mut *tx)
            .await?;

        for (model, quantity) in &purchased {
            let decremented = sqlx::query(
                "UPDATE products SET quantity = quantity - $2 WHERE model = $1 AND quantity >= $2",
            )
            .bind(model)
            .bind(*quantity)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if decremented == 0 {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM products WHERE model = $1)",
                )
                .bind(model)
                .fetch_one(&mut *tx)
                .await?;
                tx.rollback().await?;

                let model = model.clone();
                return Ok(if exists {
                    CloseOutcome::InsufficientStock { model }
                } else {
                    CloseOutcome::MissingProduct { model }
                });
            }
        }

        sqlx::query(
            "INSERT INTO cart_items (customer, model, payment_date, quantity, category, price) \
             SELECT customer, model, $3, quantity, category, price FROM cart_items \
             WHERE customer = $1 AND payment_date = $2 ORDER BY id",
        )
        .bind(customer)
        .bind(&open)
        .bind(&paid)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE customer = $1 AND payment_date = $2")
            .bind(customer)
            .bind(&open)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM carts WHERE customer = $1 AND payment_date = $2")
            .bind(customer)
            .bind(&open)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let history = self.purchase_history(customer).await?;
        Ok(CloseOutcome::Closed(history))
    }

    async fn purchase_history(&self, customer: &str) -> Result<Vec<Cart>, StorageError> {
        let carts = sqlx::query_as::<_, CartRow>(
            "SELECT customer, payment_date FROM carts WHERE customer = $1 AND paid ORDER BY id",
        )
        .bind(customer)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, LineItemRow>(
            "SELECT customer, payment_date, model, quantity, category, price \
             FROM cart_items WHERE customer = $1 AND payment_date <> $2 ORDER BY id",
        )
        .bind(customer)
        .bind(PaymentMarker::Open.to_stored())
        .fetch_all(&self.pool)
        .await?;

        assemble_carts(carts, items)
    }

    async fn clear_open_cart(&self, customer: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE customer = $1 AND payment_date = $2")
            .bind(customer)
            .bind(PaymentMarker::Open.to_stored())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all_carts(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cart_items").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM carts").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn all_carts(&self) -> Result<Vec<Cart>, StorageError> {
        // Both reads share one snapshot so no cart loses its items mid-read.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let carts =
            sqlx::query_as::<_, CartRow>("SELECT customer, payment_date FROM carts ORDER BY id")
                .fetch_all(&mut *tx)
                .await?;
        let items = sqlx::query_as::<_, LineItemRow>(
            "SELECT customer, payment_date, model, quantity, category, price \
             FROM cart_items ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        assemble_carts(carts, items)
    }
}

/// PostgreSQL-backed product catalog.
#[derive(Debug, Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    /// Creates a new catalog with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn find_by_model(&self, model: &str) -> Result<Option<Product>, StorageError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT model, category, selling_price, quantity, details, arrival_date \
             FROM products WHERE model = $1",
        )
        .bind(model)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn decrement_stock(&self, model: &str, amount: u32) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE products SET quantity = quantity - $2 WHERE model = $1 AND quantity >= $2",
        )
        .bind(model)
        .bind(bound_count(amount)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn register_product(&self, product: &Product) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO products (model, category, selling_price, quantity, details, arrival_date) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (model) DO NOTHING",
        )
        .bind(&product.model)
        .bind(product.category.as_str())
        .bind(product.selling_price)
        .bind(bound_count(product.quantity)?)
        .bind(product.details.as_deref())
        .bind(product.arrival_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
