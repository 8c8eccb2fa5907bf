use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, UserId};
use domain::{
    Address, CheckoutRequest, Notification, Order, OrderStatus, Payment, PaymentMethod,
    PaymentStatus, Product, StatusChange, TrackingNumber, price_lines,
};

use super::{InMemoryStore, newest_first};
use crate::query::paginate;
use crate::{OrderQuery, OrderStore, Result, StoreError};

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, customer_id: UserId, request: CheckoutRequest) -> Result<Order> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let now = Utc::now();

        let customer = state
            .users
            .get(&customer_id)
            .ok_or_else(|| StoreError::not_found("User", customer_id))?;

        // Validate everything before the first write.
        let locked: Vec<Product> = request
            .cart
            .product_ids()
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect();
        let lines = price_lines(&request.cart, &locked)?;
        let order = Order::place(
            customer_id,
            lines,
            request.payment_method,
            request.delivery,
            request.requested_delivery_date,
            now,
        )?;

        for line in &order.lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock -= line.quantity;
            }
        }

        let has_address = state
            .addresses
            .values()
            .any(|a| a.user_id == customer_id && a.covers(&order.delivery));
        if !has_address {
            let address = Address::from_delivery(customer_id, &customer.full_name, &order.delivery, now);
            state.addresses.insert(address.id, address);
        }

        state
            .notifications
            .push(Notification::new(customer_id, order.placed_notification(), now));
        let staff_message = order.staff_action_notification();
        let staff: Vec<UserId> = state
            .users
            .values()
            .filter(|u| u.is_staff() && u.is_active)
            .map(|u| u.id)
            .collect();
        for staff_id in staff {
            state
                .notifications
                .push(Notification::new(staff_id, staff_message.clone(), now));
        }

        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.state
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    async fn find_order_by_tracking(&self, tracking: &TrackingNumber) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .find(|o| &o.tracking_number == tracking)
            .cloned())
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| query.matches(o))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| o.order_date);
        if query.pending_first {
            orders.sort_by_key(|o| o.status != OrderStatus::Pending);
        }
        Ok(paginate(orders, query.offset, query.limit))
    }

    async fn change_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        actor: UserId,
        notes: String,
    ) -> Result<(Order, Option<StatusChange>)> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let now = Utc::now();

        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        let Some(change) = order.change_status(new_status, actor, notes, now) else {
            return Ok((order.clone(), None));
        };
        order.apply(&change);

        state.notifications.push(Notification::new(
            order.customer_id,
            order.status_notification(new_status),
            now,
        ));
        let order = order.clone();
        state.history.push(change.clone());
        Ok((order, Some(change)))
    }

    async fn status_history(&self, id: OrderId) -> Result<Vec<StatusChange>> {
        let state = self.state.read().await;
        let mut history: Vec<StatusChange> = state
            .history
            .iter()
            .filter(|c| c.order_id == id)
            .cloned()
            .collect();
        newest_first(&mut history, |c| c.changed_at);
        Ok(history)
    }

    async fn history_by_actor(&self, actor: UserId, limit: usize) -> Result<Vec<StatusChange>> {
        let state = self.state.read().await;
        let mut history: Vec<StatusChange> = state
            .history
            .iter()
            .filter(|c| c.changed_by == Some(actor))
            .cloned()
            .collect();
        newest_first(&mut history, |c| c.changed_at);
        history.truncate(limit);
        Ok(history)
    }

    async fn all_history(&self, limit: usize) -> Result<Vec<StatusChange>> {
        let state = self.state.read().await;
        let mut history = state.history.clone();
        newest_first(&mut history, |c| c.changed_at);
        history.truncate(limit);
        Ok(history)
    }

    async fn set_payment_status(&self, id: OrderId, status: PaymentStatus) -> Result<Order> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let now = Utc::now();

        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        order.set_payment_status(status, now);

        let latest = state
            .payments
            .iter()
            .enumerate()
            .filter(|(_, p)| p.order_id == id)
            .max_by_key(|(_, p)| p.created_at)
            .map(|(index, _)| index);
        match latest {
            Some(index) => state.payments[index].status = status,
            None => state.payments.push(Payment::manual(
                id,
                order.payment_method,
                order.total,
                status,
                now,
            )),
        }
        Ok(order.clone())
    }

    async fn complete_payment(
        &self,
        id: OrderId,
        method: PaymentMethod,
        transaction_id: String,
        response_data: serde_json::Value,
    ) -> Result<Payment> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let now = Utc::now();

        if let Some(existing) = state
            .payments
            .iter()
            .find(|p| p.transaction_id.as_deref() == Some(transaction_id.as_str()))
        {
            if existing.order_id != id {
                return Err(StoreError::Conflict(format!(
                    "Transaction {transaction_id} is already recorded for another order"
                )));
            }
            return Ok(existing.clone());
        }

        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        order.set_payment_status(PaymentStatus::Completed, now);

        let payment = Payment::completed(id, method, order.total, transaction_id, response_data, now);
        state.payments.push(payment.clone());
        Ok(payment)
    }

    async fn payments_for_order(&self, id: OrderId) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .iter()
            .filter(|p| p.order_id == id)
            .cloned()
            .collect();
        newest_first(&mut payments, |p| p.created_at);
        Ok(payments)
    }

    async fn list_payments(&self, limit: usize) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments = state.payments.clone();
        newest_first(&mut payments, |p| p.created_at);
        payments.truncate(limit);
        Ok(payments)
    }
}
