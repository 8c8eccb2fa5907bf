//! Back-office order handling for staff and admins.

use std::collections::HashSet;

use common::{OrderId, UserId};
use domain::{Order, OrderStatus, Payment, PaymentStatus, Shipment, StatusChange, TrackingNumber};
use serde::{Deserialize, Serialize};
use store::{OrderQuery, OrderStore, OrderStoreExt, ShipmentStore, Store};

use crate::error::{Result, ServiceError};

/// Number of recent changes shown on a staff member's activity log.
pub const ACTIVITY_LOG_LEN: usize = 20;

/// An order with everything recorded about it.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    /// Newest first.
    pub history: Vec<StatusChange>,
    pub payments: Vec<Payment>,
    pub shipment: Option<Shipment>,
}

/// A staff member's dashboard figures.
#[derive(Debug, Clone, Serialize)]
pub struct StaffActivity {
    /// Orders still waiting for confirmation, newest first.
    pub pending_orders: Vec<Order>,
    /// Distinct orders this staff member has moved at least once.
    pub orders_handled: usize,
    pub recent_changes: Vec<StatusChange>,
}

/// Admin edit of an order's status and payment status in one go.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: String,
}

/// Order operations performed from the back office.
pub struct OrderDesk<S: Store> {
    store: S,
}

impl<S: Store> OrderDesk<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Moves an order through its lifecycle, recording who did it.
    #[tracing::instrument(skip(self, notes))]
    pub async fn change_status(
        &self,
        actor: UserId,
        order_id: OrderId,
        new_status: OrderStatus,
        notes: String,
    ) -> Result<Order> {
        let (order, change) = self
            .store
            .change_status(order_id, new_status, actor, notes)
            .await?;

        match change {
            Some(change) => {
                metrics::counter!("order_status_changes_total", "to" => new_status.as_str())
                    .increment(1);
                tracing::info!(
                    tracking_number = %order.tracking_number,
                    from = %change.old_status,
                    to = %change.new_status,
                    "order status changed"
                );
            }
            None => tracing::debug!(status = %new_status, "status unchanged"),
        }
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> Result<Order> {
        let order = self.store.set_payment_status(order_id, status).await?;
        tracing::info!(tracking_number = %order.tracking_number, %status, "payment status set");
        Ok(order)
    }

    /// Applies an admin edit: the status change first (so the audit trail is
    /// kept), then the payment status.
    pub async fn update_order(
        &self,
        actor: UserId,
        order_id: OrderId,
        update: OrderUpdate,
    ) -> Result<Order> {
        let mut order = match update.status {
            Some(status) => {
                self.change_status(actor, order_id, status, update.notes)
                    .await?
            }
            None => self.store.get_order(order_id).await?,
        };
        if let Some(payment_status) = update.payment_status
            && payment_status != order.payment_status
        {
            order = self.set_payment_status(order_id, payment_status).await?;
        }
        Ok(order)
    }

    /// The staff order queue: pending orders first, each group newest first.
    pub async fn order_queue(&self, query: OrderQuery) -> Result<Vec<Order>> {
        Ok(self.store.query_orders(query.pending_first()).await?)
    }

    pub async fn order_detail(&self, order_id: OrderId) -> Result<OrderDetail> {
        let order = self.store.get_order(order_id).await?;
        self.detail_for(order).await
    }

    /// Order history of one customer, newest first.
    pub async fn customer_orders(&self, customer_id: UserId) -> Result<Vec<Order>> {
        Ok(self
            .store
            .query_orders(OrderQuery::for_customer(customer_id))
            .await?)
    }

    /// Detail of an order, only if it belongs to `customer_id`.
    pub async fn customer_order_detail(
        &self,
        customer_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetail> {
        let order = self
            .store
            .get_customer_order(customer_id, order_id)
            .await?;
        self.detail_for(order).await
    }

    async fn detail_for(&self, order: Order) -> Result<OrderDetail> {
        let history = self.store.status_history(order.id).await?;
        let payments = self.store.payments_for_order(order.id).await?;
        let shipment = self.store.find_shipment_for_order(order.id).await?;
        Ok(OrderDetail {
            order,
            history,
            payments,
            shipment,
        })
    }

    /// Public order tracking by tracking number and delivery phone.
    ///
    /// A wrong phone looks exactly like an unknown tracking number.
    #[tracing::instrument(skip(self, phone))]
    pub async fn track_order(&self, tracking_number: &str, phone: &str) -> Result<OrderDetail> {
        let not_found =
            || ServiceError::NotFound("No order matches that tracking number and phone".to_string());
        let tracking = TrackingNumber::parse(tracking_number).map_err(|_| not_found())?;
        let order = self
            .store
            .track_order(&tracking, phone)
            .await?
            .ok_or_else(not_found)?;
        self.detail_for(order).await
    }

    pub async fn staff_activity(&self, actor: UserId) -> Result<StaffActivity> {
        let pending_orders = self
            .store
            .query_orders(OrderQuery::new().status(OrderStatus::Pending))
            .await?;
        let changes = self.store.history_by_actor(actor, usize::MAX).await?;
        let orders_handled = changes
            .iter()
            .map(|change| change.order_id)
            .collect::<HashSet<_>>()
            .len();
        let recent_changes = changes.into_iter().take(ACTIVITY_LOG_LEN).collect();
        Ok(StaffActivity {
            pending_orders,
            orders_handled,
            recent_changes,
        })
    }

    /// Every recorded status change, newest first.
    pub async fn history(&self, limit: usize) -> Result<Vec<StatusChange>> {
        Ok(self.store.all_history(limit).await?)
    }

    /// Every payment record, newest first.
    pub async fn payments(&self, limit: usize) -> Result<Vec<Payment>> {
        Ok(self.store.list_payments(limit).await?)
    }
}
