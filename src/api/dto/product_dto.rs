//! Product request bodies.

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{Category, Product};

/// Request body for `POST /products`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProductRequest {
    /// Unique model identifier.
    pub model: String,
    /// Product category.
    pub category: Category,
    /// Price per unit.
    pub selling_price: f64,
    /// Initial stock.
    pub quantity: u32,
    /// Optional description.
    #[serde(default)]
    pub details: Option<String>,
    /// Optional arrival date (`YYYY-MM-DD`).
    #[serde(default)]
    pub arrival_date: Option<NaiveDate>,
}

impl From<RegisterProductRequest> for Product {
    fn from(req: RegisterProductRequest) -> Self {
        Self {
            model: req.model.trim().to_string(),
            category: req.category,
            selling_price: req.selling_price,
            quantity: req.quantity,
            details: req.details,
            arrival_date: req.arrival_date,
        }
    }
}

/// Request body for `PATCH /products/{model}/sell`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SellProductRequest {
    /// Units to sell.
    pub quantity: u32,
}
