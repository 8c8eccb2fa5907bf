//! Storefront workflows on top of the store and the payment gateways.
//!
//! Each service owns one area of the shop:
//! - [`CheckoutCoordinator`] places orders and settles online payments
//! - [`OrderDesk`] is the staff view of the order lifecycle
//! - [`AccountService`] handles sign-up, sessions and staff approval
//! - [`CatalogService`] manages products and storefront listings
//! - [`CustomerService`] covers addresses, saved items and notifications
//! - [`ShipmentService`] hands orders to Nepal Post and tracks them

pub mod accounts;
pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod error;
pub mod order_desk;
pub mod shipments;

pub use accounts::{
    AccountService, AccountSummary, AccountUpdate, NewAccount, PasswordChange, ProfileUpdate,
    SignedIn,
};
pub use catalog::{CatalogService, HomePage};
pub use checkout::{CallbackUrls, CheckoutCoordinator, ConfirmedPayment, PaymentReceipt, PlacedOrder};
pub use customers::{CustomerService, SavedProduct};
pub use error::{Result, ServiceError};
pub use order_desk::{OrderDesk, OrderDetail, OrderUpdate, StaffActivity};
pub use shipments::{ShipmentService, ShipmentTracking, TrackedOrder, TrackingUpdate};
