//! Sign-up, sign-in and the admin's user management.

use chrono::{DateTime, Duration, Utc};
use common::UserId;
use domain::account::{MIN_PASSWORD_LEN, hash_password, normalize_email, verify_password};
use domain::{AccountError, Notification, Profile, Registration, Role, Session, User};
use serde::{Deserialize, Serialize};
use store::{AccountStore, NotificationStore, Store, StoreError};

use crate::error::{Result, ServiceError};

/// Default lifetime of a sign-in session.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;

/// A user as shown to clients: never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub phone_number: Option<String>,
    pub is_approved: bool,
}

impl AccountSummary {
    pub fn new(user: &User, profile: Option<&Profile>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            is_active: user.is_active,
            date_joined: user.date_joined,
            phone_number: profile
                .map(|p| p.phone_number.clone())
                .filter(|phone| !phone.is_empty()),
            is_approved: profile.is_some_and(|p| p.is_approved),
        }
    }
}

/// A freshly opened session.
#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub account: AccountSummary,
}

/// Self-service profile edit; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Account created from the admin panel. Any role is allowed and the
/// account starts approved.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Admin edit of an account; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// Accounts, sessions and staff approval.
pub struct AccountService<S: Store> {
    store: S,
    session_ttl: Duration,
}

impl<S: Store> AccountService<S> {
    pub fn new(store: S, session_ttl: Duration) -> Self {
        Self { store, session_ttl }
    }

    /// Creates a customer or staff account.
    ///
    /// Staff accounts start unapproved and every admin is told about them.
    #[tracing::instrument(skip(self, registration), fields(role = %registration.role))]
    pub async fn register(&self, registration: Registration) -> Result<AccountSummary> {
        let registration = registration.validate()?;
        let password_hash = hash_password(&registration.password)?;
        let now = Utc::now();
        let (user, profile) = registration.into_records(password_hash, now);
        self.store.insert_user(user.clone(), profile.clone()).await?;

        if user.role == Role::Staff {
            for admin in self.store.users_with_roles(&[Role::Admin]).await? {
                self.store
                    .insert_notification(Notification::staff_registration(
                        admin.id,
                        &user.full_name,
                        &user.email,
                        now,
                    ))
                    .await?;
            }
        }

        metrics::counter!("accounts_registered_total", "role" => user.role.as_str()).increment(1);
        tracing::info!(user_id = %user.id, "account registered");
        Ok(AccountSummary::new(&user, Some(&profile)))
    }

    /// Checks credentials and opens a session.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn> {
        let email = normalize_email(email).map_err(|_| ServiceError::InvalidCredentials)?;
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            metrics::counter!("logins_failed_total").increment(1);
            return Err(ServiceError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash)? {
            metrics::counter!("logins_failed_total").increment(1);
            return Err(ServiceError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(ServiceError::AccountDisabled);
        }
        let profile = self.store.get_profile(user.id).await?;
        if user.role == Role::Staff && !profile.as_ref().is_some_and(|p| p.is_approved) {
            return Err(ServiceError::PendingApproval);
        }

        let session = Session::issue(user.id, self.session_ttl, Utc::now());
        self.store.create_session(session.clone()).await?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(SignedIn {
            token: session.token,
            expires_at: session.expires_at,
            account: AccountSummary::new(&user, profile.as_ref()),
        })
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.store.delete_session(token).await?;
        Ok(())
    }

    /// Resolves a bearer token to an active user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        match self.store.resolve_session(token, Utc::now()).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(ServiceError::Unauthenticated),
        }
    }

    /// Admins, and staff whose profile an admin has approved.
    pub async fn authorize_back_office(&self, user: &User) -> Result<()> {
        let profile = self.store.get_profile(user.id).await?;
        if user.can_access_back_office(profile.as_ref()) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Staff access requires an approved staff account".to_string(),
            ))
        }
    }

    pub fn require_admin(&self, user: &User) -> Result<()> {
        if user.is_admin() && user.is_active {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Admin access required".to_string()))
        }
    }

    pub async fn profile(&self, user_id: UserId) -> Result<AccountSummary> {
        let user = self.store.get_user(user_id).await?;
        let profile = self.store.get_profile(user_id).await?;
        Ok(AccountSummary::new(&user, profile.as_ref()))
    }

    /// Edits the signed-in user's own name, email and phone.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<AccountSummary> {
        let mut user = self.store.get_user(user_id).await?;
        if let Some(name) = update.full_name {
            user.full_name = required_name(&name)?;
        }
        if let Some(email) = update.email {
            user.email = self.available_email(&email, user.id).await?;
        }
        let user = self.store.update_user(user).await?;
        let profile = match update.phone_number {
            Some(phone) => Some(self.save_phone(user.id, &phone).await?),
            None => self.store.get_profile(user.id).await?,
        };
        Ok(AccountSummary::new(&user, profile.as_ref()))
    }

    #[tracing::instrument(skip(self, change))]
    pub async fn change_password(&self, user_id: UserId, change: PasswordChange) -> Result<()> {
        let mut user = self.store.get_user(user_id).await?;
        if !verify_password(&change.current_password, &user.password_hash)? {
            return Err(ServiceError::Invalid(
                "Current password is incorrect".to_string(),
            ));
        }
        user.password_hash = new_password_hash(&change.new_password)?;
        self.store.update_user(user).await?;
        tracing::info!("password changed");
        Ok(())
    }

    /// Profiles with their users, newest first.
    pub async fn profiles(&self, pending_only: bool) -> Result<Vec<AccountSummary>> {
        let mut summaries = Vec::new();
        for profile in self.store.list_profiles(pending_only).await? {
            let user = self.store.get_user(profile.user_id).await?;
            summaries.push(AccountSummary::new(&user, Some(&profile)));
        }
        Ok(summaries)
    }

    #[tracing::instrument(skip(self))]
    pub async fn approve_profile(&self, user_id: UserId) -> Result<AccountSummary> {
        let summary = self.set_approval(user_id, true).await?;
        self.store
            .insert_notification(Notification::account_approved(user_id, Utc::now()))
            .await?;
        tracing::info!("profile approved");
        Ok(summary)
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject_profile(&self, user_id: UserId) -> Result<AccountSummary> {
        let summary = self.set_approval(user_id, false).await?;
        tracing::info!("profile rejected");
        Ok(summary)
    }

    async fn set_approval(&self, user_id: UserId, approved: bool) -> Result<AccountSummary> {
        let user = self.store.get_user(user_id).await?;
        let mut profile = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Profile", user_id))?;
        profile.is_approved = approved;
        let profile = self.store.save_profile(profile).await?;
        Ok(AccountSummary::new(&user, Some(&profile)))
    }

    /// All accounts, newest first.
    pub async fn users(&self) -> Result<Vec<AccountSummary>> {
        let mut summaries = Vec::new();
        for user in self.store.list_users().await? {
            let profile = self.store.get_profile(user.id).await?;
            summaries.push(AccountSummary::new(&user, profile.as_ref()));
        }
        Ok(summaries)
    }

    /// Promotes a customer to staff or demotes staff to customer.
    ///
    /// Admin accounts are not toggled and nobody toggles themselves.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_staff(&self, actor: UserId, user_id: UserId) -> Result<AccountSummary> {
        if actor == user_id {
            return Err(ServiceError::Forbidden(
                "You cannot change your own staff status.".to_string(),
            ));
        }
        let mut user = self.store.get_user(user_id).await?;
        user.role = match user.role {
            Role::Customer => Role::Staff,
            Role::Staff => Role::Customer,
            Role::Admin => {
                return Err(ServiceError::Invalid(
                    "Admin accounts cannot be toggled".to_string(),
                ));
            }
        };
        let user = self.store.update_user(user).await?;
        let profile = self.store.get_profile(user.id).await?;
        tracing::info!(role = %user.role, "staff status toggled");
        Ok(AccountSummary::new(&user, profile.as_ref()))
    }

    #[tracing::instrument(skip(self, account), fields(role = %account.role))]
    pub async fn create_user(&self, account: NewAccount) -> Result<AccountSummary> {
        let full_name = required_name(&account.full_name)?;
        let email = normalize_email(&account.email)?;
        let password_hash = new_password_hash(&account.password)?;
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email,
            full_name,
            password_hash,
            role: account.role,
            is_active: account.is_active,
            date_joined: now,
        };
        let profile = Profile {
            user_id: user.id,
            phone_number: account.phone.trim().to_string(),
            is_approved: true,
            created_at: now,
        };
        self.store.insert_user(user.clone(), profile.clone()).await?;
        tracing::info!(user_id = %user.id, "account created by admin");
        Ok(AccountSummary::new(&user, Some(&profile)))
    }

    /// Admin edit of any account. Admins cannot demote or disable
    /// themselves.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_user(
        &self,
        actor: UserId,
        user_id: UserId,
        update: AccountUpdate,
    ) -> Result<AccountSummary> {
        let mut user = self.store.get_user(user_id).await?;
        if actor == user_id
            && (update.role.is_some_and(|role| role != Role::Admin) || update.is_active == Some(false))
        {
            return Err(ServiceError::Forbidden(
                "You cannot demote or disable your own account.".to_string(),
            ));
        }
        if let Some(name) = update.full_name {
            user.full_name = required_name(&name)?;
        }
        if let Some(email) = update.email {
            user.email = self.available_email(&email, user.id).await?;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(active) = update.is_active {
            user.is_active = active;
        }
        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            user.password_hash = new_password_hash(&password)?;
        }
        let user = self.store.update_user(user).await?;
        let profile = match update.phone_number {
            Some(phone) => Some(self.save_phone(user.id, &phone).await?),
            None => self.store.get_profile(user.id).await?,
        };
        Ok(AccountSummary::new(&user, profile.as_ref()))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, actor: UserId, user_id: UserId) -> Result<()> {
        if actor == user_id {
            return Err(ServiceError::Forbidden(
                "You cannot delete your own account.".to_string(),
            ));
        }
        self.store.delete_user(user_id).await?;
        tracing::info!("account deleted");
        Ok(())
    }

    /// Creates the bootstrap admin unless an account with that email exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email)?;
        if let Some(existing) = self.store.find_user_by_email(&email).await? {
            if !existing.is_admin() {
                tracing::warn!(%email, role = %existing.role, "bootstrap admin email belongs to a non-admin");
            }
            return Ok(existing);
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email,
            full_name: "Administrator".to_string(),
            password_hash: new_password_hash(password)?,
            role: Role::Admin,
            is_active: true,
            date_joined: now,
        };
        let profile = Profile {
            user_id: user.id,
            phone_number: String::new(),
            is_approved: true,
            created_at: now,
        };
        self.store.insert_user(user.clone(), profile).await?;
        tracing::info!(email = %user.email, "bootstrap admin created");
        Ok(user)
    }

    async fn available_email(&self, raw: &str, owner: UserId) -> Result<String> {
        let email = normalize_email(raw)?;
        match self.store.find_user_by_email(&email).await? {
            Some(other) if other.id != owner => {
                Err(ServiceError::Invalid("Email already exists.".to_string()))
            }
            _ => Ok(email),
        }
    }

    async fn save_phone(&self, user_id: UserId, phone: &str) -> Result<Profile> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(AccountError::MissingPhone.into());
        }
        let profile = match self.store.get_profile(user_id).await? {
            Some(profile) => Profile {
                phone_number: phone.to_string(),
                ..profile
            },
            None => Profile {
                user_id,
                phone_number: phone.to_string(),
                is_approved: true,
                created_at: Utc::now(),
            },
        };
        Ok(self.store.save_profile(profile).await?)
    }
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccountError::EmptyName.into());
    }
    Ok(name.to_string())
}

fn new_password_hash(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::WeakPassword.into());
    }
    Ok(hash_password(password)?)
}
