//! In-memory store implementation for tests and local runs.
//!
//! All data sits behind one `RwLock`, so every write operation is atomic
//! with respect to the others, the same guarantee the PostgreSQL store gets
//! from transactions and row locks.

mod accounts;
mod catalog;
mod content;
mod customers;
mod notifications;
mod orders;
mod shipments;

use std::collections::HashMap;
use std::sync::Arc;

use common::{AddressId, OrderId, ProductId, ShipmentId, UserId};
use domain::{
    Address, Notification, Order, Payment, Product, Profile, SavedItem, Session, Shipment,
    SiteContent, StatusChange, User,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    history: Vec<StatusChange>,
    payments: Vec<Payment>,
    users: HashMap<UserId, User>,
    profiles: HashMap<UserId, Profile>,
    sessions: HashMap<String, Session>,
    addresses: HashMap<AddressId, Address>,
    saved_items: Vec<SavedItem>,
    notifications: Vec<Notification>,
    shipments: HashMap<ShipmentId, Shipment>,
    content: Option<SiteContent>,
}

/// In-memory store.
///
/// Provides the same interface and the same transactional guarantees as
/// [`crate::PostgresStore`]. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all data.
    pub async fn clear(&self) {
        *self.state.write().await = State::default();
    }
}

/// Newest-first ordering shared by the listing operations.
fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}
