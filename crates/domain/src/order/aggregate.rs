//! Order aggregate.

use chrono::{DateTime, Days, NaiveDate, Utc};
use common::{OrderId, StatusChangeId, UserId};
use serde::{Deserialize, Serialize};

use super::{
    DeliveryDetails, OrderError, OrderLine, OrderStatus, PaymentMethod, PaymentStatus,
    StatusChange, TrackingNumber,
};
use crate::money::Money;

/// Days between placing an order and its default delivery estimate.
pub const ESTIMATED_DELIVERY_DAYS: u64 = 5;

/// A customer order and its fulfilment state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub lines: Vec<OrderLine>,
    /// Human-readable line summary, e.g. `"Oslo Sofa x1, Dining Chair x4"`.
    pub items_summary: String,
    pub total: Money,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub delivery: DeliveryDetails,
    pub tracking_number: TrackingNumber,
    pub estimated_delivery_date: NaiveDate,
    pub assigned_staff: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

// Command methods
impl Order {
    /// Builds a new pending order from already priced lines.
    ///
    /// The total is always derived from the lines. When the customer asks
    /// for a delivery date it must not precede the order date; otherwise the
    /// estimate is [`ESTIMATED_DELIVERY_DAYS`] after placing the order.
    pub fn place(
        customer_id: UserId,
        lines: Vec<OrderLine>,
        payment_method: PaymentMethod,
        delivery: DeliveryDetails,
        requested_delivery_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        delivery.validate()?;

        let today = now.date_naive();
        let estimated_delivery_date = match requested_delivery_date {
            Some(date) if date < today => return Err(OrderError::DeliveryDateInPast { date }),
            Some(date) => date,
            None => today
                .checked_add_days(Days::new(ESTIMATED_DELIVERY_DAYS))
                .unwrap_or(today),
        };

        let total = lines.iter().map(OrderLine::total_price).sum();
        let items_summary = summarize(&lines);

        Ok(Self {
            id: OrderId::new(),
            customer_id,
            lines,
            items_summary,
            total,
            order_date: now,
            status: OrderStatus::Pending,
            payment_method,
            payment_status: PaymentStatus::Pending,
            delivery,
            tracking_number: TrackingNumber::generate(),
            estimated_delivery_date,
            assigned_staff: None,
            updated_at: now,
        })
    }

    /// Builds the audit entry for a status change requested by a staff member.
    ///
    /// Returns `None` when the order is already in `new_status`; nothing
    /// should be recorded in that case.
    pub fn change_status(
        &self,
        new_status: OrderStatus,
        actor: UserId,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<StatusChange> {
        if self.status == new_status {
            return None;
        }

        Some(StatusChange {
            id: StatusChangeId::new(),
            order_id: self.id,
            old_status: self.status,
            new_status,
            changed_by: Some(actor),
            changed_at: now,
            notes: notes.into(),
        })
    }

    /// Applies a recorded status change.
    ///
    /// The acting staff member picks up the order if nobody has yet.
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.new_status;
        if self.assigned_staff.is_none() {
            self.assigned_staff = change.changed_by;
        }
        self.updated_at = change.changed_at;
    }

    /// Sets the payment status. Returns false when it was already set.
    pub fn set_payment_status(&mut self, status: PaymentStatus, now: DateTime<Utc>) -> bool {
        if self.payment_status == status {
            return false;
        }
        self.payment_status = status;
        self.updated_at = now;
        true
    }
}

// Query methods
impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status.is_paid()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Returns true if `phone` matches the delivery phone on file.
    pub fn matches_delivery_phone(&self, phone: &str) -> bool {
        self.delivery.phone == phone.trim()
    }

    /// Message sent to the customer when the status changes.
    pub fn status_notification(&self, status: OrderStatus) -> String {
        format!(
            "Your Order #{} status has been updated to: {}.",
            self.tracking_number, status
        )
    }

    /// Message sent to the customer right after checkout.
    pub fn placed_notification(&self) -> String {
        format!(
            "Order #{} placed successfully! Status: {}.",
            self.tracking_number, self.status
        )
    }

    /// Message sent to every staff member right after checkout.
    pub fn staff_action_notification(&self) -> String {
        format!(
            "ACTION REQUIRED: Pending Order #{} - Deliver to {}.",
            self.tracking_number, self.delivery.address
        )
    }
}

fn summarize(lines: &[OrderLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{} x{}", line.product_name, line.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use common::ProductId;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap()
    }

    fn delivery() -> DeliveryDetails {
        DeliveryDetails::new("Lazimpat, Kathmandu", "9841000000", "Call on arrival").unwrap()
    }

    fn lines() -> Vec<OrderLine> {
        vec![
            OrderLine::new(ProductId::new(), "Oslo Sofa", 1, Money::from_rupees(45000)),
            OrderLine::new(ProductId::new(), "Dining Chair", 4, Money::from_rupees(3500)),
        ]
    }

    fn placed() -> Order {
        Order::place(
            UserId::new(),
            lines(),
            PaymentMethod::Cod,
            delivery(),
            None,
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_place_computes_total_and_summary() {
        let order = placed();
        assert_eq!(order.total, Money::from_rupees(59000));
        assert_eq!(order.items_summary, "Oslo Sofa x1, Dining Chair x4");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.total_quantity(), 5);
        assert!(order.tracking_number.as_str().starts_with("FNQ-"));
    }

    #[test]
    fn test_place_estimates_delivery_five_days_out() {
        let order = placed();
        assert_eq!(
            order.estimated_delivery_date,
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_place_honours_requested_date() {
        let requested = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let order = Order::place(
            UserId::new(),
            lines(),
            PaymentMethod::Khalti,
            delivery(),
            Some(requested),
            now(),
        )
        .unwrap();
        assert_eq!(order.estimated_delivery_date, requested);

        let past = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let err = Order::place(
            UserId::new(),
            lines(),
            PaymentMethod::Khalti,
            delivery(),
            Some(past),
            now(),
        )
        .unwrap_err();
        assert_eq!(err, OrderError::DeliveryDateInPast { date: past });
    }

    #[test]
    fn test_place_rejects_empty_orders() {
        let err = Order::place(
            UserId::new(),
            vec![],
            PaymentMethod::Cod,
            delivery(),
            None,
            now(),
        )
        .unwrap_err();
        assert_eq!(err, OrderError::EmptyOrder);
    }

    #[test]
    fn test_change_status_records_actor_and_assigns() {
        let mut order = placed();
        let staff = UserId::new();

        let change = order
            .change_status(OrderStatus::Confirmed, staff, "Called customer", now())
            .unwrap();
        assert_eq!(change.old_status, OrderStatus::Pending);
        assert_eq!(change.new_status, OrderStatus::Confirmed);
        assert_eq!(change.changed_by, Some(staff));
        assert_eq!(change.notes, "Called customer");

        order.apply(&change);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.assigned_staff, Some(staff));

        let other = UserId::new();
        let change = order
            .change_status(OrderStatus::Processing, other, "", now())
            .unwrap();
        order.apply(&change);
        assert_eq!(order.assigned_staff, Some(staff));
    }

    #[test]
    fn test_change_to_same_status_is_noop() {
        let order = placed();
        let change = order.change_status(OrderStatus::Pending, UserId::new(), "", now());
        assert!(change.is_none());
    }

    #[test]
    fn test_change_status_allows_corrections() {
        let mut order = placed();
        let staff = UserId::new();
        for next in [
            OrderStatus::Delivered,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
            OrderStatus::Pending,
        ] {
            let change = order.change_status(next, staff, "", now()).unwrap();
            order.apply(&change);
            assert_eq!(order.status, next);
        }
    }

    #[test]
    fn test_notification_messages() {
        let order = placed();
        let tracking = order.tracking_number.clone();
        assert_eq!(
            order.status_notification(OrderStatus::Shipped),
            format!("Your Order #{tracking} status has been updated to: Shipped.")
        );
        assert_eq!(
            order.placed_notification(),
            format!("Order #{tracking} placed successfully! Status: Pending.")
        );
        assert_eq!(
            order.staff_action_notification(),
            format!("ACTION REQUIRED: Pending Order #{tracking} - Deliver to Lazimpat, Kathmandu.")
        );
    }

    #[test]
    fn test_set_payment_status_reports_change() {
        let mut order = placed();
        assert!(order.set_payment_status(PaymentStatus::Completed, now()));
        assert!(!order.set_payment_status(PaymentStatus::Completed, now()));
        assert!(order.is_paid());
    }

    #[test]
    fn test_delivery_phone_match_ignores_whitespace() {
        let order = placed();
        assert!(order.matches_delivery_phone(" 9841000000 "));
        assert!(!order.matches_delivery_phone("9800000000"));
    }
}
