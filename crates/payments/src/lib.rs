//! Online payment gateways for the FurniQ storefront.
//!
//! Two Nepali gateways are supported behind the [`PaymentGateway`] trait:
//! - eSewa, which takes an HMAC-signed form post and is confirmed through
//!   its transaction status API
//! - Khalti, which hands out a hosted payment page (`pidx`) and is
//!   confirmed through its lookup API
//!
//! Cash on delivery needs no gateway.

pub mod config;
pub mod error;
pub mod esewa;
pub mod gateway;
pub mod khalti;
pub mod memory;

pub use config::{EsewaConfig, GatewayConfig, KhaltiConfig};
pub use error::{GatewayError, Result};
pub use esewa::EsewaGateway;
pub use gateway::{
    CustomerInfo, GatewayRegistry, PaymentCallback, PaymentConfirmation, PaymentGateway,
    PaymentInitiation, PaymentRequest, VerificationOutcome, VerifyRequest,
};
pub use khalti::KhaltiGateway;
pub use memory::InMemoryGateway;
