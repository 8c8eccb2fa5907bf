//! Value objects for the order domain.

use common::ProductId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderError;
use crate::money::Money;

/// Customer-facing order reference, e.g. `FNQ-3FA85F64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    const PREFIX: &'static str = "FNQ-";
    const CODE_LEN: usize = 8;

    /// Generates a fresh tracking number from a random UUID.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}{}",
            Self::PREFIX,
            hex[..Self::CODE_LEN].to_ascii_uppercase()
        ))
    }

    /// Parses user input, normalising case and surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, OrderError> {
        let candidate = input.trim().to_ascii_uppercase();
        let valid = candidate
            .strip_prefix(Self::PREFIX)
            .is_some_and(|code| {
                code.len() == Self::CODE_LEN && code.chars().all(|c| c.is_ascii_hexdigit())
            });
        if valid {
            Ok(Self(candidate))
        } else {
            Err(OrderError::InvalidTrackingNumber(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where and how an order is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub instructions: String,
}

impl DeliveryDetails {
    /// Creates delivery details; address and phone are required.
    pub fn new(
        address: impl Into<String>,
        phone: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Result<Self, OrderError> {
        let details = Self {
            address: address.into().trim().to_string(),
            phone: phone.into().trim().to_string(),
            instructions: instructions.into().trim().to_string(),
        };
        details.validate()?;
        Ok(details)
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        if self.address.trim().is_empty() {
            return Err(OrderError::MissingDeliveryAddress);
        }
        if self.phone.trim().is_empty() {
            return Err(OrderError::MissingDeliveryPhone);
        }
        Ok(())
    }

    /// First comma-separated segment of the address (street line).
    pub fn first_line(&self) -> &str {
        self.address.split(',').next().unwrap_or_default().trim()
    }
}

/// A priced line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,

    /// Product name at the time of purchase.
    pub product_name: String,

    pub quantity: u32,

    /// Catalog price per unit at the time of purchase.
    pub unit_price: Money,
}

impl OrderLine {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tracking_number_shape() {
        let tracking = TrackingNumber::generate();
        let code = tracking.as_str().strip_prefix("FNQ-").unwrap();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(tracking, TrackingNumber::generate());
    }

    #[test]
    fn test_tracking_number_parse_normalises_input() {
        let parsed = TrackingNumber::parse("  fnq-0a1b2c3d ").unwrap();
        assert_eq!(parsed.as_str(), "FNQ-0A1B2C3D");
        assert!(TrackingNumber::parse("NP-1234567890").is_err());
        assert!(TrackingNumber::parse("FNQ-XYZ").is_err());
    }

    #[test]
    fn test_delivery_details_require_address_and_phone() {
        assert_eq!(
            DeliveryDetails::new("  ", "9800000000", ""),
            Err(OrderError::MissingDeliveryAddress)
        );
        assert_eq!(
            DeliveryDetails::new("Baneshwor, Kathmandu", "", ""),
            Err(OrderError::MissingDeliveryPhone)
        );
        let details = DeliveryDetails::new("Baneshwor-10, Kathmandu", "9800000000", "").unwrap();
        assert_eq!(details.first_line(), "Baneshwor-10");
    }

    #[test]
    fn test_order_line_total() {
        let line = OrderLine::new(ProductId::new(), "Dining Chair", 4, Money::from_rupees(3500));
        assert_eq!(line.total_price(), Money::from_rupees(14000));
    }
}
