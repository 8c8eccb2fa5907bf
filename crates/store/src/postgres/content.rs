use async_trait::async_trait;
use domain::SiteContent;

use super::PostgresStore;
use crate::{ContentStore, Result};

#[async_trait]
impl ContentStore for PostgresStore {
    async fn get_content(&self) -> Result<SiteContent> {
        let content: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT content FROM site_content WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        match content {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(SiteContent::default()),
        }
    }

    async fn save_content(&self, content: SiteContent) -> Result<SiteContent> {
        sqlx::query(
            r#"
            INSERT INTO site_content (id, content, updated_at)
            VALUES (1, $1, NOW())
            ON CONFLICT (id) DO UPDATE SET
                content = EXCLUDED.content,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(serde_json::to_value(&content)?)
        .execute(&self.pool)
        .await?;
        Ok(content)
    }
}
