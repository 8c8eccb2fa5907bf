use chrono::{DateTime, Utc};
use common::{OrderId, StatusChangeId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// One entry of an order's status audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: StatusChangeId,
    pub order_id: OrderId,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    /// Staff member or admin who made the change; cleared if their account
    /// is later deleted.
    pub changed_by: Option<UserId>,
    pub changed_at: DateTime<Utc>,
    pub notes: String,
}
