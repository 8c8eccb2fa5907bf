use async_trait::async_trait;
use common::{NotificationId, UserId};
use domain::Notification;
use sqlx::{PgConnection, Row, postgres::PgRow};
use uuid::Uuid;

use super::PostgresStore;
use crate::{NotificationStore, Result, StoreError};

pub(super) async fn insert_notification(
    conn: &mut PgConnection,
    notification: &Notification,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, message, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(notification.id.as_uuid())
    .bind(notification.user_id.as_uuid())
    .bind(&notification.message)
    .bind(notification.is_read)
    .bind(notification.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn row_to_notification(row: &PgRow) -> Result<Notification> {
    Ok(Notification {
        id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        message: row.try_get("message")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_notification(&mut conn, &notification).await
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, message, is_read, created_at
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Notification", id));
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
                .bind(user_id.as_uuid())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
