//! Nepal Post shipment tracking.

use chrono::{DateTime, Utc};
use common::{OrderId, ShipmentId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShipmentError {
    #[error("Tracking event field '{0}' is required")]
    MissingField(&'static str),

    #[error("Invalid Nepal Post tracking number: {0}")]
    InvalidTrackingNumber(String),
}

/// One scan or status update reported by the carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub status: String,
    pub description: String,
}

/// An order handed over to Nepal Post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub order_id: OrderId,
    /// `NP-` followed by ten digits.
    pub tracking_number: String,
    pub current_location: String,
    pub current_status: String,
    /// Oldest first.
    pub history: Vec<TrackingEvent>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub const TRACKING_PREFIX: &'static str = "NP-";

    /// Starts tracking an order with a freshly generated number.
    pub fn new(order_id: OrderId, now: DateTime<Utc>) -> Self {
        Self {
            id: ShipmentId::new(),
            order_id,
            tracking_number: Self::generate_tracking_number(),
            current_location: "Processing".to_string(),
            current_status: "Package Received".to_string(),
            history: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn generate_tracking_number() -> String {
        let digits: u64 = rand::thread_rng().gen_range(0..10_000_000_000);
        format!("{}{digits:010}", Self::TRACKING_PREFIX)
    }

    /// Returns true if `input` has the `NP-` + ten digits shape.
    pub fn is_tracking_number(input: &str) -> bool {
        input
            .strip_prefix(Self::TRACKING_PREFIX)
            .is_some_and(|digits| digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit()))
    }

    /// Appends a carrier update and moves the current location/status.
    pub fn add_event(
        &mut self,
        location: &str,
        status: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ShipmentError> {
        let location = required("location", location)?;
        let status = required("status", status)?;
        let description = required("description", description)?;

        self.current_location = location.clone();
        self.current_status = status.clone();
        self.updated_at = now;
        self.history.push(TrackingEvent {
            timestamp: now,
            location,
            status,
            description,
        });
        Ok(())
    }

    /// History newest first, as shown on the public tracking page.
    pub fn history_newest_first(&self) -> impl Iterator<Item = &TrackingEvent> {
        self.history.iter().rev()
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ShipmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ShipmentError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_shipment_defaults() {
        let shipment = Shipment::new(OrderId::new(), Utc::now());
        assert!(Shipment::is_tracking_number(&shipment.tracking_number));
        assert_eq!(shipment.current_location, "Processing");
        assert_eq!(shipment.current_status, "Package Received");
        assert!(shipment.history.is_empty());
    }

    #[test]
    fn test_tracking_number_shape() {
        assert!(Shipment::is_tracking_number("NP-0012345678"));
        assert!(!Shipment::is_tracking_number("NP-12345"));
        assert!(!Shipment::is_tracking_number("FNQ-0A1B2C3D"));
    }

    #[test]
    fn test_add_event_updates_current_state() {
        let mut shipment = Shipment::new(OrderId::new(), Utc::now());
        shipment
            .add_event("Kathmandu Hub", "In Transit", "Departed sorting centre", Utc::now())
            .unwrap();
        shipment
            .add_event("Pokhara", "Out for Delivery", "With courier", Utc::now())
            .unwrap();

        assert_eq!(shipment.current_location, "Pokhara");
        assert_eq!(shipment.current_status, "Out for Delivery");
        assert_eq!(shipment.history.len(), 2);
        let newest = shipment.history_newest_first().next().unwrap();
        assert_eq!(newest.location, "Pokhara");
    }

    #[test]
    fn test_add_event_requires_all_fields() {
        let mut shipment = Shipment::new(OrderId::new(), Utc::now());
        let err = shipment
            .add_event("Pokhara", " ", "With courier", Utc::now())
            .unwrap_err();
        assert_eq!(err, ShipmentError::MissingField("status"));
        assert!(shipment.history.is_empty());
    }
}
