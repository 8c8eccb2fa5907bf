//! PostgreSQL-backed store.
//!
//! Multi-row writes (checkout, status changes, payments) run in a single
//! transaction. Checkout locks the cart's product rows with
//! `SELECT ... FOR UPDATE` in ascending id order before touching stock.

mod accounts;
mod catalog;
mod content;
mod customers;
mod notifications;
mod orders;
mod shipments;

use std::fmt::Display;
use std::str::FromStr;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, StoreError};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a unique-constraint violation to a readable conflict, leaving other
/// database errors as they are.
fn map_unique_violation(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && let Some(message) = db_err.constraint().and_then(conflict_message)
    {
        return StoreError::Conflict(message.to_string());
    }
    StoreError::Database(e)
}

fn conflict_message(constraint: &str) -> Option<&'static str> {
    match constraint {
        "unique_user_email" => Some("An account with this email already exists"),
        "unique_profile_phone" => Some("This phone number is already registered"),
        "unique_order_tracking" => Some("Tracking number already in use, please retry"),
        "unique_shipment_order" => Some("This order is already assigned to Nepal Post"),
        "unique_shipment_tracking" => Some("Nepal Post tracking number already in use"),
        "unique_payment_transaction" => Some("This transaction is already recorded"),
        _ => None,
    }
}

/// Parses a text column into a domain enum.
fn parse_column<T>(value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Corrupt(e.to_string()))
}

/// Converts a non-negative integer column to `u32`.
fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

/// Converts a `u32` to the `INTEGER` column type.
fn to_i32(value: u32, column: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

/// Binds a row count as `BIGINT`, saturating at the column maximum.
fn to_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
