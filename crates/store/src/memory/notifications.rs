use async_trait::async_trait;
use common::{NotificationId, UserId};
use domain::Notification;

use super::{InMemoryStore, newest_first};
use crate::{NotificationStore, Result, StoreError};

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        self.state.write().await.notifications.push(notification);
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let state = self.state.read().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        newest_first(&mut notifications, |n| n.created_at);
        Ok(notifications)
    }

    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<()> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or_else(|| StoreError::not_found("Notification", id))?;
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }
}
