//! Service error types.

use domain::{
    AccountError, CatalogError, CheckoutError, DomainError, Money, OrderError, ShipmentError,
};
use payments::GatewayError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while running a storefront workflow.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Persistence error, including checkout refusals raised inside the
    /// checkout transaction.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Payment gateway error.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Business rule violation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The requested record does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// Input rejected by the workflow itself.
    #[error("{0}")]
    Invalid(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Your account is pending approval by an administrator")]
    PendingApproval,

    #[error("This account has been disabled")]
    AccountDisabled,

    /// No valid session.
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated, but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// The gateway reported the payment as not settled.
    #[error("Payment not completed (status: {status})")]
    PaymentNotCompleted { status: String },

    /// The gateway settled a different amount than the order total.
    #[error("Paid amount {paid} does not match the order total {expected}")]
    AmountMismatch { expected: Money, paid: Money },
}

macro_rules! domain_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ServiceError {
                fn from(err: $source) -> Self {
                    ServiceError::Domain(DomainError::from(err))
                }
            }
        )*
    };
}

domain_error_from!(AccountError, CatalogError, CheckoutError, OrderError, ShipmentError);

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
