use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use super::{AccountError, MIN_PASSWORD_LEN};

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Staff,
    /// Superuser with access to the whole back-office.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            _ => Err(AccountError::UnknownRole(s.to_string())),
        }
    }
}

/// A registered account. The email doubles as the login name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Per-user contact and approval data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub phone_number: String,
    /// Staff accounts need an admin's approval before signing in.
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns true for staff and admins.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff | Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins always reach the back-office; staff only once approved.
    pub fn can_access_back_office(&self, profile: Option<&Profile>) -> bool {
        match self.role {
            Role::Admin => self.is_active,
            Role::Staff => self.is_active && profile.is_some_and(|p| p.is_approved),
            Role::Customer => false,
        }
    }
}

/// Sign-up form input.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    #[serde(default)]
    pub role: Role,
}

impl Registration {
    /// Checks the form and returns it with normalised name, email and phone.
    pub fn validate(self) -> Result<Self, AccountError> {
        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AccountError::EmptyName);
        }
        let email = normalize_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::WeakPassword);
        }
        let phone = self.phone.trim().to_string();
        if phone.is_empty() {
            return Err(AccountError::MissingPhone);
        }
        if self.role == Role::Admin {
            return Err(AccountError::RoleNotAllowed(Role::Admin));
        }
        Ok(Self {
            full_name,
            email,
            phone,
            ..self
        })
    }

    /// Builds the user and profile records. Staff start unapproved.
    pub fn into_records(self, password_hash: String, now: DateTime<Utc>) -> (User, Profile) {
        let user = User {
            id: UserId::new(),
            email: self.email,
            full_name: self.full_name,
            password_hash,
            role: self.role,
            is_active: true,
            date_joined: now,
        };
        let profile = Profile {
            user_id: user.id,
            phone_number: self.phone,
            is_approved: self.role != Role::Staff,
            created_at: now,
        };
        (user, profile)
    }
}

/// Lower-cases and trims an email, rejecting obviously malformed input.
pub fn normalize_email(raw: &str) -> Result<String, AccountError> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(AccountError::InvalidEmail(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(role: Role) -> Registration {
        Registration {
            full_name: " Sita Sharma ".into(),
            email: " Sita@Example.COM ".into(),
            password: "correct horse".into(),
            phone: " 9841000001 ".into(),
            role,
        }
    }

    #[test]
    fn test_validate_normalises_fields() {
        let reg = registration(Role::Customer).validate().unwrap();
        assert_eq!(reg.full_name, "Sita Sharma");
        assert_eq!(reg.email, "sita@example.com");
        assert_eq!(reg.phone, "9841000001");
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut reg = registration(Role::Customer);
        reg.email = "not-an-email".into();
        assert!(matches!(reg.validate(), Err(AccountError::InvalidEmail(_))));

        let mut reg = registration(Role::Customer);
        reg.password = "short".into();
        assert_eq!(reg.validate().unwrap_err(), AccountError::WeakPassword);

        let mut reg = registration(Role::Customer);
        reg.phone = "  ".into();
        assert_eq!(reg.validate().unwrap_err(), AccountError::MissingPhone);

        assert_eq!(
            registration(Role::Admin).validate().unwrap_err(),
            AccountError::RoleNotAllowed(Role::Admin)
        );
    }

    #[test]
    fn test_staff_start_unapproved() {
        let now = Utc::now();
        let (staff, profile) = registration(Role::Staff)
            .validate()
            .unwrap()
            .into_records("hash".into(), now);
        assert!(!profile.is_approved);
        assert!(staff.is_staff());
        assert!(!staff.can_access_back_office(Some(&profile)));

        let approved = Profile {
            is_approved: true,
            ..profile
        };
        assert!(staff.can_access_back_office(Some(&approved)));
    }

    #[test]
    fn test_customers_are_approved_but_not_back_office() {
        let (customer, profile) = registration(Role::Customer)
            .validate()
            .unwrap()
            .into_records("hash".into(), Utc::now());
        assert!(profile.is_approved);
        assert!(!customer.can_access_back_office(Some(&profile)));
    }

    #[test]
    fn test_admin_access_needs_active_account() {
        let (mut admin, _) = registration(Role::Customer)
            .validate()
            .unwrap()
            .into_records("hash".into(), Utc::now());
        admin.role = Role::Admin;
        assert!(admin.can_access_back_office(None));
        admin.is_active = false;
        assert!(!admin.can_access_back_office(None));
    }
}
