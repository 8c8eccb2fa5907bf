use async_trait::async_trait;
use domain::SiteContent;

use super::InMemoryStore;
use crate::{ContentStore, Result};

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn get_content(&self) -> Result<SiteContent> {
        Ok(self
            .state
            .read()
            .await
            .content
            .clone()
            .unwrap_or_default())
    }

    async fn save_content(&self, content: SiteContent) -> Result<SiteContent> {
        self.state.write().await.content = Some(content.clone());
        Ok(content)
    }
}
