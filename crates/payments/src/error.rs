//! Payment gateway error types.

use domain::PaymentMethod;
use thiserror::Error;

/// Errors raised while talking to a payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP request could not be sent or timed out.
    #[error("Gateway request failed: {0}")]
    Request(String),

    /// The gateway answered with a non-success status code.
    #[error("Gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The gateway answered with a body we could not understand.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    /// The callback signature did not match.
    #[error("Payment signature verification failed")]
    InvalidSignature,

    /// The callback carried no usable transaction reference.
    #[error("Invalid payment reference: {0}")]
    InvalidReference(String),

    /// The customer cancelled, or the gateway reported the payment as failed.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// No gateway is registered for the payment method.
    #[error("No payment gateway for {0}")]
    Unsupported(PaymentMethod),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Request(err.to_string())
    }
}

/// Convenience type alias for gateway results.
pub type Result<T> = std::result::Result<T, GatewayError>;
