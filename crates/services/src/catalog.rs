//! Catalog management and storefront listings.

use chrono::Utc;
use common::ProductId;
use domain::{
    Category, NewProduct, Product, ProductUpdate, SiteContent, SiteContentUpdate, StockAdjustment,
};
use serde::Serialize;
use store::{CatalogStore, ContentStore, ProductQuery, Store};

use crate::error::{Result, ServiceError};

/// Featured products shown on the home page.
pub const HOME_FEATURED_LIMIT: usize = 6;

/// Everything the storefront home page shows.
#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub content: SiteContent,
    pub featured: Vec<Product>,
    pub popular: Vec<Product>,
    pub special_offers: Vec<Product>,
}

pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let product = Product::create(input, Utc::now())?;
        let product = self.store.insert_product(product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        let mut product = self.store.get_product(id).await?;
        product.apply_update(update)?;
        Ok(self.store.update_product(product).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.store.delete_product(id).await?;
        tracing::info!("product deleted");
        Ok(())
    }

    /// Hides an active product from the storefront or shows a hidden one.
    pub async fn toggle_active(&self, id: ProductId) -> Result<Product> {
        let mut product = self.store.get_product(id).await?;
        product.toggle_active();
        let product = self.store.update_product(product).await?;
        tracing::info!(product_id = %id, is_active = product.is_active, "product visibility toggled");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(&self, id: ProductId, adjustment: StockAdjustment) -> Result<Product> {
        let product = self.store.adjust_stock(id, adjustment).await?;
        metrics::gauge!("product_stock", "product" => product.id.to_string())
            .set(f64::from(product.stock));
        tracing::info!(stock = product.stock, "stock adjusted");
        Ok(product)
    }

    /// Any product, hidden ones included.
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        Ok(self.store.get_product(id).await?)
    }

    /// A product as a shopper sees it: hidden products do not exist.
    pub async fn storefront_product(&self, id: ProductId) -> Result<Product> {
        let product = self.store.get_product(id).await?;
        if product.is_active {
            Ok(product)
        } else {
            Err(ServiceError::NotFound(format!("Product not found: {id}")))
        }
    }

    pub async fn products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        Ok(self.store.query_products(query).await?)
    }

    pub async fn category(&self, category: Category) -> Result<Vec<Product>> {
        self.products(ProductQuery::storefront().category(category))
            .await
    }

    /// Storefront search by product name. A blank term finds nothing.
    pub async fn search(&self, term: &str) -> Result<Vec<Product>> {
        if term.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.products(ProductQuery::storefront().search(term)).await
    }

    pub async fn home_page(&self) -> Result<HomePage> {
        let content = self.store.get_content().await?;
        let featured = self
            .products(ProductQuery::storefront().featured().limit(HOME_FEATURED_LIMIT))
            .await?;
        let popular = self.products(ProductQuery::storefront().popular()).await?;
        let special_offers = self
            .products(ProductQuery::storefront().special_offers())
            .await?;
        Ok(HomePage {
            content,
            featured,
            popular,
            special_offers,
        })
    }

    pub async fn site_content(&self) -> Result<SiteContent> {
        Ok(self.store.get_content().await?)
    }

    pub async fn update_site_content(&self, update: SiteContentUpdate) -> Result<SiteContent> {
        let mut content = self.store.get_content().await?;
        content.apply(update);
        let content = self.store.save_content(content).await?;
        tracing::info!("site content updated");
        Ok(content)
    }
}
