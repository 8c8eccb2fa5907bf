use async_trait::async_trait;
use common::ProductId;
use domain::{Product, StockAdjustment};

use super::{InMemoryStore, newest_first};
use crate::query::paginate;
use crate::{CatalogStore, ProductQuery, Result, StoreError};

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_product(&self, product: Product) -> Result<Product> {
        let mut state = self.state.write().await;
        if state.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!(
                "Product {} already exists",
                product.id
            )));
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.state
            .read()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    async fn update_product(&self, product: Product) -> Result<Product> {
        let mut state = self.state.write().await;
        let slot = state
            .products
            .get_mut(&product.id)
            .ok_or_else(|| StoreError::not_found("Product", product.id))?;
        *slot = product.clone();
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .products
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;
        state.saved_items.retain(|item| item.product_id != id);
        Ok(())
    }

    async fn query_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        newest_first(&mut products, |p| p.created_at);
        Ok(paginate(products, query.offset, query.limit))
    }

    async fn adjust_stock(&self, id: ProductId, adjustment: StockAdjustment) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;
        product.stock = adjustment.apply(product.stock)?;
        Ok(product.clone())
    }
}
