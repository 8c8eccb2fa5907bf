use domain::{AccountError, CatalogError, CheckoutError, OrderError, ShipmentError};
use thiserror::Error;

/// Errors that can occur when reading or writing storefront data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness rule was violated (email, phone, tracking number...).
    #[error("{0}")]
    Conflict(String),

    /// Checkout was refused; nothing was written.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Shipment(#[from] ShipmentError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be read back into a domain type.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
