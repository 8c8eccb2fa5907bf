//! Nepal Post shipments and their public tracking page.

use chrono::{DateTime, NaiveDate, Utc};
use common::{OrderId, ShipmentId};
use domain::{Order, OrderStatus, Shipment, TrackingEvent, TrackingNumber};
use serde::{Deserialize, Serialize};
use store::{OrderStore, ShipmentStore, Store};

use crate::error::{Result, ServiceError};

pub const NOT_ASSIGNED_MESSAGE: &str = "This order has not been assigned to Nepal Post yet.";
pub const NOT_FOUND_MESSAGE: &str = "Tracking number not found. Please check and try again.";

/// A carrier update entered by staff.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingUpdate {
    pub location: String,
    pub status: String,
    pub description: String,
}

/// The order as the public tracking page shows it: no customer details.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedOrder {
    pub tracking_number: TrackingNumber,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub estimated_delivery_date: NaiveDate,
}

impl From<&Order> for TrackedOrder {
    fn from(order: &Order) -> Self {
        Self {
            tracking_number: order.tracking_number.clone(),
            status: order.status,
            order_date: order.order_date,
            estimated_delivery_date: order.estimated_delivery_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentTracking {
    pub tracking_number: String,
    pub current_location: String,
    pub current_status: String,
    pub order: TrackedOrder,
    /// Newest first.
    pub history: Vec<TrackingEvent>,
}

impl ShipmentTracking {
    fn new(shipment: Shipment, order: &Order) -> Self {
        let history = shipment.history_newest_first().cloned().collect();
        Self {
            tracking_number: shipment.tracking_number,
            current_location: shipment.current_location,
            current_status: shipment.current_status,
            order: order.into(),
            history,
        }
    }
}

pub struct ShipmentService<S: Store> {
    store: S,
}

impl<S: Store> ShipmentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Hands an order over to Nepal Post with a new `NP-` number.
    #[tracing::instrument(skip(self))]
    pub async fn assign(&self, order_id: OrderId) -> Result<Shipment> {
        let order = self.store.get_order(order_id).await?;
        let shipment = self
            .store
            .insert_shipment(Shipment::new(order.id, Utc::now()))
            .await?;
        tracing::info!(
            tracking_number = %order.tracking_number,
            np_number = %shipment.tracking_number,
            "order assigned to Nepal Post"
        );
        Ok(shipment)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn add_tracking_event(
        &self,
        shipment_id: ShipmentId,
        update: TrackingUpdate,
    ) -> Result<Shipment> {
        let shipment = self
            .store
            .add_tracking_event(
                shipment_id,
                update.location,
                update.status,
                update.description,
            )
            .await?;
        tracing::info!(
            location = %shipment.current_location,
            status = %shipment.current_status,
            "tracking event added"
        );
        Ok(shipment)
    }

    /// Looks a shipment up by its Nepal Post number, falling back to the
    /// order's own tracking number.
    pub async fn track(&self, number: &str) -> Result<ShipmentTracking> {
        let number = number.trim();
        if number.is_empty() {
            return Err(ServiceError::Invalid(
                "Please enter a tracking number.".to_string(),
            ));
        }

        if let Some(shipment) = self.store.find_shipment_by_number(number).await? {
            let order = self.store.get_order(shipment.order_id).await?;
            return Ok(ShipmentTracking::new(shipment, &order));
        }

        let order = match TrackingNumber::parse(number) {
            Ok(tracking) => self.store.find_order_by_tracking(&tracking).await?,
            Err(_) => None,
        };
        let order = order.ok_or_else(|| ServiceError::NotFound(NOT_FOUND_MESSAGE.to_string()))?;
        match self.store.find_shipment_for_order(order.id).await? {
            Some(shipment) => Ok(ShipmentTracking::new(shipment, &order)),
            None => Err(ServiceError::NotFound(NOT_ASSIGNED_MESSAGE.to_string())),
        }
    }
}
