use chrono::{DateTime, Duration, Utc};
use common::UserId;
use uuid::Uuid;

/// A signed-in session, identified by an opaque bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Opens a session for `user_id` lasting `ttl`.
    pub fn issue(user_id: UserId, ttl: Duration, now: DateTime<Utc>) -> Self {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self {
            token,
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_session_expires_after_ttl() {
        let now = Utc::now();
        let session = Session::issue(UserId::new(), Duration::hours(2), now);
        assert_eq!(session.token.len(), 64);
        assert!(!session.is_expired(now + Duration::hours(1)));
        assert!(session.is_expired(now + Duration::hours(2)));
    }
}
