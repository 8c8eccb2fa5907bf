use chrono::{DateTime, Utc};
use common::{NotificationId, UserId};
use serde::{Deserialize, Serialize};

/// An in-app message for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: UserId, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            message: message.into(),
            is_read: false,
            created_at: now,
        }
    }

    pub fn account_approved(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self::new(
            user_id,
            "Your account has been approved! You can now access all features.",
            now,
        )
    }

    /// Sent to each admin when a staff member signs up.
    pub fn staff_registration(
        admin_id: UserId,
        full_name: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            admin_id,
            format!("New staff registration: {full_name} ({email}). Approval required."),
            now,
        )
    }
}
