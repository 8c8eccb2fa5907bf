//! Identifier types shared across the FurniQ crates.

pub mod types;

pub use types::{
    AddressId, NotificationId, OrderId, PaymentId, ProductId, ShipmentId, StatusChangeId, UserId,
};
