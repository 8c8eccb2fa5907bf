//! Users, profiles, addresses, saved items and notifications.

mod address;
mod notification;
mod password;
mod session;
mod user;

pub use address::{Address, AddressDraft, sort_for_display};
pub use notification::Notification;
pub use password::{MIN_PASSWORD_LEN, hash_password, verify_password};
pub use session::Session;
pub use user::{Profile, Registration, Role, User, normalize_email};

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by account rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Full name is required")]
    EmptyName,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least 8 characters")]
    WeakPassword,

    #[error("Phone number is required")]
    MissingPhone,

    #[error("Cannot register with role {0}")]
    RoleNotAllowed(Role),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Address field '{0}' is required")]
    MissingAddressField(&'static str),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// A product bookmarked by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}
