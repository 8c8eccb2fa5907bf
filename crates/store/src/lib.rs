//! Persistence for the storefront.
//!
//! [`Store`] bundles one trait per area (catalog, orders, accounts, customer
//! data, notifications, shipments, site content). [`InMemoryStore`] backs
//! tests and local runs; [`PostgresStore`] is the production implementation
//! and performs checkout as a single transaction with row locks.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{OrderQuery, ProductQuery};
pub use store::{
    AccountStore, CatalogStore, ContentStore, CustomerStore, NotificationStore, OrderStore,
    OrderStoreExt, ShipmentStore, Store,
};
