//! A signed-in customer's own data: addresses, saved items and
//! notifications.

use chrono::{DateTime, Utc};
use common::{AddressId, NotificationId, ProductId, UserId};
use domain::{Address, AddressDraft, Notification, Product};
use serde::Serialize;
use store::{CatalogStore, CustomerStore, NotificationStore, Store, StoreError};

use crate::error::Result;

/// A bookmarked product with the time it was saved.
#[derive(Debug, Clone, Serialize)]
pub struct SavedProduct {
    pub saved_at: DateTime<Utc>,
    pub product: Product,
}

pub struct CustomerService<S: Store> {
    store: S,
}

impl<S: Store> CustomerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Default address first, then newest.
    pub async fn addresses(&self, user_id: UserId) -> Result<Vec<Address>> {
        Ok(self.store.list_addresses(user_id).await?)
    }

    pub async fn add_address(&self, user_id: UserId, draft: AddressDraft) -> Result<Address> {
        let address = Address::create(user_id, draft, Utc::now())?;
        Ok(self.store.save_address(address).await?)
    }

    pub async fn update_address(
        &self,
        user_id: UserId,
        id: AddressId,
        draft: AddressDraft,
    ) -> Result<Address> {
        let mut address = self.store.get_address(user_id, id).await?;
        address.update(draft)?;
        Ok(self.store.save_address(address).await?)
    }

    pub async fn delete_address(&self, user_id: UserId, id: AddressId) -> Result<()> {
        Ok(self.store.delete_address(user_id, id).await?)
    }

    /// Bookmarked products, newest first. Products deleted since are
    /// skipped.
    pub async fn saved_items(&self, user_id: UserId) -> Result<Vec<SavedProduct>> {
        let mut saved = Vec::new();
        for item in self.store.list_saved_items(user_id).await? {
            match self.store.get_product(item.product_id).await {
                Ok(product) => saved.push(SavedProduct {
                    saved_at: item.created_at,
                    product,
                }),
                Err(StoreError::NotFound { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(saved)
    }

    pub async fn save_item(&self, user_id: UserId, product_id: ProductId) -> Result<SavedProduct> {
        let item = self.store.add_saved_item(user_id, product_id).await?;
        let product = self.store.get_product(product_id).await?;
        Ok(SavedProduct {
            saved_at: item.created_at,
            product,
        })
    }

    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<()> {
        Ok(self.store.remove_saved_item(user_id, product_id).await?)
    }

    pub async fn notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        Ok(self.store.list_notifications(user_id, unread_only).await?)
    }

    pub async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<()> {
        Ok(self.store.mark_notification_read(user_id, id).await?)
    }

    /// Returns how many notifications were still unread.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        Ok(self.store.mark_all_read(user_id).await?)
    }
}
