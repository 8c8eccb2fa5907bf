use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::UserId;
use domain::{Profile, Role, Session, User};

use super::{InMemoryStore, State, newest_first};
use crate::{AccountStore, Result, StoreError};

impl State {
    fn ensure_unique_email(&self, email: &str, except: Option<UserId>) -> Result<()> {
        let taken = self
            .users
            .values()
            .any(|u| u.email == email && Some(u.id) != except);
        if taken {
            return Err(StoreError::Conflict(format!(
                "An account with email {email} already exists"
            )));
        }
        Ok(())
    }

    fn ensure_unique_phone(&self, phone: &str, except: UserId) -> Result<()> {
        if phone.is_empty() {
            return Ok(());
        }
        let taken = self
            .profiles
            .values()
            .any(|p| p.phone_number == phone && p.user_id != except);
        if taken {
            return Err(StoreError::Conflict(format!(
                "Phone number {phone} is already registered"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert_user(&self, user: User, profile: Profile) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_unique_email(&user.email, None)?;
        state.ensure_unique_phone(&profile.phone_number, user.id)?;
        state.profiles.insert(user.id, profile);
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        newest_first(&mut users, |u| u.date_joined);
        Ok(users)
    }

    async fn users_with_roles(&self, roles: &[Role]) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.is_active && roles.contains(&u.role))
            .cloned()
            .collect();
        newest_first(&mut users, |u| u.date_joined);
        Ok(users)
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(StoreError::not_found("User", user.id));
        }
        state.ensure_unique_email(&user.email, Some(user.id))?;
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state
            .users
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("User", id))?;

        state.profiles.remove(&id);
        state.sessions.retain(|_, s| s.user_id != id);
        state.addresses.retain(|_, a| a.user_id != id);
        state.saved_items.retain(|item| item.user_id != id);
        state.notifications.retain(|n| n.user_id != id);

        let removed_orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.customer_id == id)
            .map(|o| o.id)
            .collect();
        state.orders.retain(|_, o| o.customer_id != id);
        state
            .history
            .retain(|c| !removed_orders.contains(&c.order_id));
        state
            .payments
            .retain(|p| !removed_orders.contains(&p.order_id));
        state
            .shipments
            .retain(|_, s| !removed_orders.contains(&s.order_id));

        for change in state.history.iter_mut() {
            if change.changed_by == Some(id) {
                change.changed_by = None;
            }
        }
        for order in state.orders.values_mut() {
            if order.assigned_staff == Some(id) {
                order.assigned_staff = None;
            }
        }
        for product in state.products.values_mut() {
            if product.assigned_staff == Some(id) {
                product.assigned_staff = None;
            }
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        Ok(self.state.read().await.profiles.get(&user_id).cloned())
    }

    async fn list_profiles(&self, pending_only: bool) -> Result<Vec<Profile>> {
        let state = self.state.read().await;
        let mut profiles: Vec<Profile> = state
            .profiles
            .values()
            .filter(|p| !pending_only || !p.is_approved)
            .cloned()
            .collect();
        newest_first(&mut profiles, |p| p.created_at);
        Ok(profiles)
    }

    async fn save_profile(&self, profile: Profile) -> Result<Profile> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&profile.user_id) {
            return Err(StoreError::not_found("User", profile.user_id));
        }
        state.ensure_unique_phone(&profile.phone_number, profile.user_id)?;
        state.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn create_session(&self, session: Session) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&session.user_id) {
            return Err(StoreError::not_found("User", session.user_id));
        }
        state.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn resolve_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .get(token)
            .filter(|s| !s.is_expired(now))
            .and_then(|s| state.users.get(&s.user_id))
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.state.write().await.sessions.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn records(email: &str, phone: &str) -> (User, Profile) {
        let user = User {
            id: UserId::new(),
            email: email.into(),
            full_name: "Ram Karki".into(),
            password_hash: "hash".into(),
            role: Role::Customer,
            is_active: true,
            date_joined: Utc::now(),
        };
        let profile = Profile {
            user_id: user.id,
            phone_number: phone.into(),
            is_approved: true,
            created_at: Utc::now(),
        };
        (user, profile)
    }

    #[tokio::test]
    async fn duplicate_email_and_phone_conflict() {
        let store = InMemoryStore::new();
        let (user, profile) = records("ram@furniq.test", "9800000001");
        store.insert_user(user, profile).await.unwrap();

        let (user, profile) = records("ram@furniq.test", "9800000002");
        assert!(matches!(
            store.insert_user(user, profile).await,
            Err(StoreError::Conflict(_))
        ));

        let (user, profile) = records("other@furniq.test", "9800000001");
        assert!(matches!(
            store.insert_user(user, profile).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let store = InMemoryStore::new();
        let (user, profile) = records("ram@furniq.test", "9800000001");
        let user_id = user.id;
        store.insert_user(user, profile).await.unwrap();

        let now = Utc::now();
        let session = Session::issue(user_id, Duration::hours(1), now);
        let token = session.token.clone();
        store.create_session(session).await.unwrap();

        assert!(store.resolve_session(&token, now).await.unwrap().is_some());
        assert!(
            store
                .resolve_session(&token, now + Duration::hours(2))
                .await
                .unwrap()
                .is_none()
        );

        store.delete_session(&token).await.unwrap();
        assert!(store.resolve_session(&token, now).await.unwrap().is_none());
    }
}
