//! Orders, their status lifecycle and payments.

mod aggregate;
mod history;
mod payment;
mod status;
mod value_objects;

pub use aggregate::{ESTIMATED_DELIVERY_DAYS, Order};
pub use history::StatusChange;
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use status::OrderStatus;
pub use value_objects::{DeliveryDetails, OrderLine, TrackingNumber};

use chrono::NaiveDate;
use common::ProductId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// Order has no lines.
    #[error("Order has no items")]
    EmptyOrder,

    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: u32,
    },

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("Unknown payment status: {0}")]
    UnknownPaymentStatus(String),

    #[error("Delivery address is required")]
    MissingDeliveryAddress,

    #[error("Delivery phone is required")]
    MissingDeliveryPhone,

    #[error("Requested delivery date {date} is in the past")]
    DeliveryDateInPast { date: NaiveDate },

    #[error("Invalid tracking number: {0}")]
    InvalidTrackingNumber(String),
}
