use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, NotificationId, OrderId, ProductId, ShipmentId, UserId};
use domain::{
    Address, CheckoutRequest, Notification, Order, OrderStatus, Payment, PaymentMethod,
    PaymentStatus, Product, Profile, Role, SavedItem, Session, Shipment, SiteContent,
    StatusChange, StockAdjustment, TrackingNumber, User,
};

use crate::{OrderQuery, ProductQuery, Result};

/// Product catalog persistence.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_product(&self, product: Product) -> Result<Product>;

    /// Returns `NotFound` if the product doesn't exist.
    async fn get_product(&self, id: ProductId) -> Result<Product>;

    /// Replaces a stored product.
    async fn update_product(&self, product: Product) -> Result<Product>;

    async fn delete_product(&self, id: ProductId) -> Result<()>;

    async fn query_products(&self, query: ProductQuery) -> Result<Vec<Product>>;

    /// Applies a stock correction atomically against the current level.
    async fn adjust_stock(&self, id: ProductId, adjustment: StockAdjustment) -> Result<Product>;
}

/// Orders, their audit trail and payments.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Places an order atomically.
    ///
    /// Within one transaction: every product in the cart is locked, priced
    /// and checked for stock, stock is decremented, the order is written,
    /// the delivery address is saved for the customer if new, and the
    /// customer and all staff are notified. Any failure leaves nothing
    /// behind.
    async fn place_order(&self, customer_id: UserId, request: CheckoutRequest) -> Result<Order>;

    /// Returns `NotFound` if the order doesn't exist.
    async fn get_order(&self, id: OrderId) -> Result<Order>;

    async fn find_order_by_tracking(&self, tracking: &TrackingNumber) -> Result<Option<Order>>;

    /// Orders matching a query, newest first.
    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Moves an order to `new_status` on behalf of `actor`.
    ///
    /// The order row is locked for the duration. The audit entry and the
    /// customer notification are written with the new status. Returns the
    /// updated order and the recorded change, or `None` when the order was
    /// already in `new_status`.
    async fn change_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        actor: UserId,
        notes: String,
    ) -> Result<(Order, Option<StatusChange>)>;

    /// An order's audit trail, newest first.
    async fn status_history(&self, id: OrderId) -> Result<Vec<StatusChange>>;

    /// Changes made by one staff member, newest first.
    async fn history_by_actor(&self, actor: UserId, limit: usize) -> Result<Vec<StatusChange>>;

    /// Every recorded change, newest first.
    async fn all_history(&self, limit: usize) -> Result<Vec<StatusChange>>;

    /// Sets the order's payment status and mirrors it on its latest payment
    /// record, creating one if the order has none.
    async fn set_payment_status(&self, id: OrderId, status: PaymentStatus) -> Result<Order>;

    /// Records a settled gateway payment and marks the order paid.
    ///
    /// Repeating the call with the same transaction id returns the payment
    /// recorded the first time.
    async fn complete_payment(
        &self,
        id: OrderId,
        method: PaymentMethod,
        transaction_id: String,
        response_data: serde_json::Value,
    ) -> Result<Payment>;

    /// Payments recorded against an order, newest first.
    async fn payments_for_order(&self, id: OrderId) -> Result<Vec<Payment>>;

    /// All payments, newest first.
    async fn list_payments(&self, limit: usize) -> Result<Vec<Payment>>;
}

/// Extension trait providing convenience lookups for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Public order tracking: the order is only revealed when the delivery
    /// phone matches too.
    async fn track_order(&self, tracking: &TrackingNumber, phone: &str) -> Result<Option<Order>> {
        Ok(self
            .find_order_by_tracking(tracking)
            .await?
            .filter(|order| order.matches_delivery_phone(phone)))
    }

    /// Fetches an order only if it belongs to `customer_id`.
    async fn get_customer_order(&self, customer_id: UserId, id: OrderId) -> Result<Order> {
        let order = self.get_order(id).await?;
        if order.customer_id == customer_id {
            Ok(order)
        } else {
            Err(crate::StoreError::not_found("Order", id))
        }
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

/// Users, profiles and sessions.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a user with its profile. Fails with `Conflict` when the
    /// email or phone number is taken.
    async fn insert_user(&self, user: User, profile: Profile) -> Result<()>;

    async fn get_user(&self, id: UserId) -> Result<User>;

    /// `email` must already be normalised.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Active users holding any of `roles`.
    async fn users_with_roles(&self, roles: &[Role]) -> Result<Vec<User>>;

    async fn update_user(&self, user: User) -> Result<User>;

    /// Deletes a user with everything they own.
    async fn delete_user(&self, id: UserId) -> Result<()>;

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>>;

    /// Profiles, newest first; only unapproved ones when `pending_only`.
    async fn list_profiles(&self, pending_only: bool) -> Result<Vec<Profile>>;

    /// Inserts or replaces a profile.
    async fn save_profile(&self, profile: Profile) -> Result<Profile>;

    async fn create_session(&self, session: Session) -> Result<()>;

    /// Returns the session's user if the token exists and has not expired.
    async fn resolve_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>>;

    async fn delete_session(&self, token: &str) -> Result<()>;
}

/// Saved addresses and bookmarked products.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Inserts or replaces an address. A default address clears the flag
    /// on the owner's other addresses.
    async fn save_address(&self, address: Address) -> Result<Address>;

    /// The user's addresses, default first, then newest.
    async fn list_addresses(&self, user_id: UserId) -> Result<Vec<Address>>;

    /// Fetches an address only if it belongs to `user_id`.
    async fn get_address(&self, user_id: UserId, id: AddressId) -> Result<Address>;

    async fn delete_address(&self, user_id: UserId, id: AddressId) -> Result<()>;

    /// Bookmarks a product. Saving it twice keeps the first entry.
    async fn add_saved_item(&self, user_id: UserId, product_id: ProductId) -> Result<SavedItem>;

    async fn remove_saved_item(&self, user_id: UserId, product_id: ProductId) -> Result<()>;

    /// Bookmarked products, newest first.
    async fn list_saved_items(&self, user_id: UserId) -> Result<Vec<SavedItem>>;
}

/// In-app notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: Notification) -> Result<()>;

    /// A user's notifications, newest first.
    async fn list_notifications(&self, user_id: UserId, unread_only: bool)
    -> Result<Vec<Notification>>;

    /// Marks one notification read. `NotFound` unless it belongs to `user_id`.
    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<()>;

    /// Marks every notification of the user read, returning how many changed.
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64>;
}

/// Nepal Post shipments.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Fails with `Conflict` if the order already has a shipment.
    async fn insert_shipment(&self, shipment: Shipment) -> Result<Shipment>;

    async fn get_shipment(&self, id: ShipmentId) -> Result<Shipment>;

    async fn find_shipment_by_number(&self, tracking_number: &str) -> Result<Option<Shipment>>;

    async fn find_shipment_for_order(&self, order_id: OrderId) -> Result<Option<Shipment>>;

    /// Appends a carrier update to a shipment.
    async fn add_tracking_event(
        &self,
        id: ShipmentId,
        location: String,
        status: String,
        description: String,
    ) -> Result<Shipment>;
}

/// Editable storefront copy.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// The saved content, or the defaults if nothing was saved yet.
    async fn get_content(&self) -> Result<SiteContent>;

    async fn save_content(&self, content: SiteContent) -> Result<SiteContent>;
}

/// Everything the storefront persists.
pub trait Store:
    CatalogStore
    + OrderStore
    + AccountStore
    + CustomerStore
    + NotificationStore
    + ShipmentStore
    + ContentStore
    + Clone
    + 'static
{
}

impl<T> Store for T where
    T: CatalogStore
        + OrderStore
        + AccountStore
        + CustomerStore
        + NotificationStore
        + ShipmentStore
        + ContentStore
        + Clone
        + 'static
{
}
