//! Domain layer for the FurniQ storefront.
//!
//! This crate holds the business rules, free of any storage or transport:
//! - Money in paisa
//! - Catalog products, categories and stock corrections
//! - Orders with their status state machine, audit entries and payments
//! - Cart validation and server-side pricing at checkout
//! - Accounts, profiles, addresses, saved items and notifications
//! - Nepal Post shipment tracking and editable site content

pub mod account;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod error;
pub mod money;
pub mod order;
pub mod shipment;

pub use account::{
    AccountError, Address, AddressDraft, Notification, Profile, Registration, Role, SavedItem,
    Session, User,
};
pub use catalog::{CatalogError, Category, NewProduct, Product, ProductUpdate, StockAdjustment};
pub use checkout::{Cart, CartLine, CheckoutError, CheckoutRequest, price_lines};
pub use content::{SiteContent, SiteContentUpdate};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    DeliveryDetails, Order, OrderError, OrderLine, OrderStatus, Payment, PaymentMethod,
    PaymentStatus, StatusChange, TrackingNumber,
};
pub use shipment::{Shipment, ShipmentError, TrackingEvent};
