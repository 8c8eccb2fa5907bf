//! Payment methods, payment status and payment records.

use chrono::{DateTime, Utc};
use common::{OrderId, PaymentId};
use serde::{Deserialize, Serialize};

use super::OrderError;
use crate::money::Money;

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[serde(rename = "eSewa")]
    Esewa,
    Khalti,
    /// Cash on delivery.
    #[default]
    #[serde(rename = "COD")]
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Esewa => "eSewa",
            PaymentMethod::Khalti => "Khalti",
            PaymentMethod::Cod => "COD",
        }
    }

    /// Returns true if payment happens through an online gateway.
    pub fn is_online(&self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "esewa" => Ok(PaymentMethod::Esewa),
            "khalti" => Ok(PaymentMethod::Khalti),
            "cod" | "cash on delivery" => Ok(PaymentMethod::Cod),
            _ => Err(OrderError::UnknownPaymentMethod(s.to_string())),
        }
    }
}

/// Settlement status of an order's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| OrderError::UnknownPaymentStatus(s.to_string()))
    }
}

/// A payment attempt or settlement recorded against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Gateway reference (eSewa `ref_id`, Khalti `transaction_id`).
    pub transaction_id: Option<String>,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    /// Raw gateway verification payload, kept for reconciliation.
    pub response_data: Option<serde_json::Value>,
}

impl Payment {
    /// A payment record without a gateway reference, as created when staff
    /// set the payment status by hand.
    pub fn manual(
        order_id: OrderId,
        method: PaymentMethod,
        amount: Money,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            transaction_id: None,
            method,
            amount,
            status,
            created_at: now,
            response_data: None,
        }
    }

    /// A settled gateway payment.
    pub fn completed(
        order_id: OrderId,
        method: PaymentMethod,
        amount: Money,
        transaction_id: impl Into<String>,
        response_data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            transaction_id: Some(transaction_id.into()),
            method,
            amount,
            status: PaymentStatus::Completed,
            created_at: now,
            response_data: Some(response_data),
        }
    }
}
