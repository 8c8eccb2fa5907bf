//! Domain error types.

use thiserror::Error;

use crate::account::AccountError;
use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::order::OrderError;
use crate::shipment::ShipmentError;

/// Any rule violation raised by the domain layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Shipment(#[from] ShipmentError),
}
