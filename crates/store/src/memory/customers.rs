use async_trait::async_trait;
use chrono::Utc;
use common::{AddressId, ProductId, UserId};
use domain::{Address, SavedItem, account::sort_for_display};

use super::{InMemoryStore, newest_first};
use crate::{CustomerStore, Result, StoreError};

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn save_address(&self, address: Address) -> Result<Address> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.addresses.get(&address.id)
            && existing.user_id != address.user_id
        {
            return Err(StoreError::not_found("Address", address.id));
        }
        if address.is_default {
            for other in state.addresses.values_mut() {
                if other.user_id == address.user_id {
                    other.is_default = false;
                }
            }
        }
        state.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn list_addresses(&self, user_id: UserId) -> Result<Vec<Address>> {
        let state = self.state.read().await;
        let mut addresses: Vec<Address> = state
            .addresses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        sort_for_display(&mut addresses);
        Ok(addresses)
    }

    async fn get_address(&self, user_id: UserId, id: AddressId) -> Result<Address> {
        let state = self.state.read().await;
        state
            .addresses
            .get(&id)
            .filter(|a| a.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Address", id))
    }

    async fn delete_address(&self, user_id: UserId, id: AddressId) -> Result<()> {
        let mut state = self.state.write().await;
        match state.addresses.get(&id) {
            Some(address) if address.user_id == user_id => {
                state.addresses.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::not_found("Address", id)),
        }
    }

    async fn add_saved_item(&self, user_id: UserId, product_id: ProductId) -> Result<SavedItem> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&product_id) {
            return Err(StoreError::not_found("Product", product_id));
        }
        if let Some(existing) = state
            .saved_items
            .iter()
            .find(|item| item.user_id == user_id && item.product_id == product_id)
        {
            return Ok(existing.clone());
        }
        let item = SavedItem {
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        state.saved_items.push(item.clone());
        Ok(item)
    }

    async fn remove_saved_item(&self, user_id: UserId, product_id: ProductId) -> Result<()> {
        self.state
            .write()
            .await
            .saved_items
            .retain(|item| !(item.user_id == user_id && item.product_id == product_id));
        Ok(())
    }

    async fn list_saved_items(&self, user_id: UserId) -> Result<Vec<SavedItem>> {
        let state = self.state.read().await;
        let mut items: Vec<SavedItem> = state
            .saved_items
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut items, |item| item.created_at);
        Ok(items)
    }
}
