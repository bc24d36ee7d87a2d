//! Catalog product as seen by the cart core.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    /// Phones.
    Smartphone,
    /// Laptops and notebooks.
    Laptop,
    /// Household appliances.
    Appliance,
}

impl Category {
    /// Returns the stored/wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smartphone => "Smartphone",
            Self::Laptop => "Laptop",
            Self::Appliance => "Appliance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Smartphone" => Ok(Self::Smartphone),
            "Laptop" => Ok(Self::Laptop),
            "Appliance" => Ok(Self::Appliance),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A product row in the catalog.
///
/// `quantity` is the live stock counter; the cart core only ever reads it
/// and decrements it through a guarded update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique model identifier.
    pub model: String,
    /// Product category.
    pub category: Category,
    /// Current selling price per unit.
    pub selling_price: f64,
    /// Units available in stock.
    pub quantity: u32,
    /// Free-form description.
    #[serde(default)]
    pub details: Option<String>,
    /// Date the stock arrived.
    #[serde(default)]
    pub arrival_date: Option<NaiveDate>,
}

impl Product {
    /// Largest stock count any storage backend accepts.
    pub const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

    /// Returns `true` if at least `wanted` units are in stock.
    #[must_use]
    pub fn can_supply(&self, wanted: u32) -> bool {
        self.quantity >= wanted
    }
}
