use chrono::{DateTime, Utc};
use common::{AddressId, UserId};
use serde::{Deserialize, Serialize};

use super::AccountError;
use crate::order::DeliveryDetails;

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub label: String,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Address form input, used for both create and edit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressDraft {
    pub label: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_default: bool,
}

impl AddressDraft {
    fn validate(&self) -> Result<(), AccountError> {
        let required = [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("line1", &self.line1),
            ("city", &self.city),
            ("state", &self.state),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(AccountError::MissingAddressField(*field)),
            None => Ok(()),
        }
    }

    fn label(&self) -> String {
        self.label
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or("Home")
            .to_string()
    }
}

impl Address {
    pub fn create(
        user_id: UserId,
        draft: AddressDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, AccountError> {
        draft.validate()?;
        Ok(Self {
            id: AddressId::new(),
            user_id,
            label: draft.label(),
            full_name: draft.full_name.trim().to_string(),
            phone: draft.phone.trim().to_string(),
            line1: draft.line1.trim().to_string(),
            line2: draft.line2.trim().to_string(),
            city: draft.city.trim().to_string(),
            state: draft.state.trim().to_string(),
            postal_code: draft.postal_code.trim().to_string(),
            is_default: draft.is_default,
            created_at: now,
        })
    }

    /// Replaces the editable fields, keeping id, owner and creation time.
    pub fn update(&mut self, draft: AddressDraft) -> Result<(), AccountError> {
        let replacement = Self::create(self.user_id, draft, self.created_at)?;
        *self = Self {
            id: self.id,
            ..replacement
        };
        Ok(())
    }

    /// Address captured automatically from a checkout's delivery details.
    pub fn from_delivery(
        user_id: UserId,
        full_name: &str,
        delivery: &DeliveryDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AddressId::new(),
            user_id,
            label: "Delivery".to_string(),
            full_name: full_name.to_string(),
            phone: delivery.phone.clone(),
            line1: delivery.address.clone(),
            line2: String::new(),
            city: "-".to_string(),
            state: "-".to_string(),
            postal_code: String::new(),
            is_default: false,
            created_at: now,
        }
    }

    /// Returns true if this address already covers the delivery's street line.
    pub fn covers(&self, delivery: &DeliveryDetails) -> bool {
        let first = delivery.first_line();
        self.line1 == delivery.address || self.line1.eq_ignore_ascii_case(first)
    }
}

/// Default address first, then newest first.
pub fn sort_for_display(addresses: &mut [Address]) {
    addresses.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then(b.created_at.cmp(&a.created_at))
    });
}
