//! HTTP handlers, grouped by area.

pub mod accounts;
pub mod catalog;
pub mod customers;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod shipments;

use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ApiError;

/// Default page size for back-office listings.
pub const DEFAULT_LIMIT: usize = 100;

/// `?limit=` for listings that only page by count.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// Parses an id taken from the path.
fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
