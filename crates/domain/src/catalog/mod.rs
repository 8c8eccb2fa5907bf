//! Product catalog.

mod product;
mod stock;

pub use product::{NewProduct, Product, ProductUpdate};
pub use stock::StockAdjustment;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by catalog rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Product name is required")]
    EmptyName,

    #[error("Invalid price: {price} paisa (must be greater than 0)")]
    InvalidPrice { price: i64 },

    #[error("Stock cannot be negative (got {value})")]
    NegativeStock { value: i64 },

    #[error("Stock value {value} is too large")]
    StockOverflow { value: i64 },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// Furniture categories offered by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Bedroom,
    #[serde(rename = "Living Room")]
    LivingRoom,
    Dining,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 3] = [Category::Bedroom, Category::LivingRoom, Category::Dining];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bedroom => "Bedroom",
            Category::LivingRoom => "Living Room",
            Category::Dining => "Dining",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "bedroom" => Ok(Category::Bedroom),
            "livingroom" => Ok(Category::LivingRoom),
            "dining" => Ok(Category::Dining),
            _ => Err(CatalogError::UnknownCategory(s.to_string())),
        }
    }
}
