use serde::{Deserialize, Serialize};

use super::CatalogError;

/// A manual stock correction made by staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAdjustment {
    /// Replace the stock with an exact count.
    Set(i64),
    /// Add one unit.
    Increase,
    /// Remove one unit; a no-op when already at zero.
    Decrease,
}

impl StockAdjustment {
    /// Returns the stock level after applying this adjustment.
    pub fn apply(&self, current: u32) -> Result<u32, CatalogError> {
        match *self {
            StockAdjustment::Set(value) if value < 0 => Err(CatalogError::NegativeStock { value }),
            StockAdjustment::Set(value) => {
                u32::try_from(value).map_err(|_| CatalogError::StockOverflow { value })
            }
            StockAdjustment::Increase => {
                current
                    .checked_add(1)
                    .ok_or(CatalogError::StockOverflow {
                        value: i64::from(current) + 1,
                    })
            }
            StockAdjustment::Decrease => Ok(current.saturating_sub(1)),
        }
    }
}
