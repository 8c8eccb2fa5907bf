use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ShipmentId};
use domain::Shipment;

use super::InMemoryStore;
use crate::{Result, ShipmentStore, StoreError};

#[async_trait]
impl ShipmentStore for InMemoryStore {
    async fn insert_shipment(&self, shipment: Shipment) -> Result<Shipment> {
        let mut state = self.state.write().await;
        if !state.orders.contains_key(&shipment.order_id) {
            return Err(StoreError::not_found("Order", shipment.order_id));
        }
        if state
            .shipments
            .values()
            .any(|s| s.order_id == shipment.order_id)
        {
            return Err(StoreError::Conflict(
                "This order is already assigned to Nepal Post".to_string(),
            ));
        }
        if state
            .shipments
            .values()
            .any(|s| s.tracking_number == shipment.tracking_number)
        {
            return Err(StoreError::Conflict(format!(
                "Tracking number {} is already in use",
                shipment.tracking_number
            )));
        }
        state.shipments.insert(shipment.id, shipment.clone());
        Ok(shipment)
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Shipment> {
        self.state
            .read()
            .await
            .shipments
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Shipment", id))
    }

    async fn find_shipment_by_number(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let state = self.state.read().await;
        Ok(state
            .shipments
            .values()
            .find(|s| s.tracking_number == tracking_number)
            .cloned())
    }

    async fn find_shipment_for_order(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        let state = self.state.read().await;
        Ok(state
            .shipments
            .values()
            .find(|s| s.order_id == order_id)
            .cloned())
    }

    async fn add_tracking_event(
        &self,
        id: ShipmentId,
        location: String,
        status: String,
        description: String,
    ) -> Result<Shipment> {
        let mut state = self.state.write().await;
        let shipment = state
            .shipments
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Shipment", id))?;
        shipment.add_event(&location, &status, &description, Utc::now())?;
        Ok(shipment.clone())
    }
}
