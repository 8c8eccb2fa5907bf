//! Storefront listings, product management and site content.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{ProductId, UserId};
use domain::{
    Category, Money, NewProduct, Product, ProductUpdate, SiteContent, SiteContentUpdate,
    StockAdjustment,
};
use serde::Deserialize;
use services::HomePage;
use store::{ProductQuery, Store};

use super::parse_id;
use crate::auth::{AdminUser, StaffUser};
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub featured: bool,
    pub popular: bool,
    pub special_offers: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ProductListQuery {
    fn into_query(self, base: ProductQuery) -> Result<ProductQuery, ApiError> {
        let mut query = base;
        if let Some(category) = self.category.filter(|c| !c.trim().is_empty()) {
            let category: Category = category
                .parse()
                .map_err(|e: domain::CatalogError| ApiError::BadRequest(e.to_string()))?;
            query = query.category(category);
        }
        if let Some(term) = self.q {
            query = query.search(term);
        }
        if self.featured {
            query = query.featured();
        }
        if self.popular {
            query = query.popular();
        }
        if self.special_offers {
            query = query.special_offers();
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

fn yes() -> bool {
    true
}

/// New product; prices in paisa.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_paisa: i64,
    pub old_price_paisa: Option<i64>,
    pub stock: u32,
    pub category: Category,
    pub image: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub is_special_offer: bool,
    #[serde(default = "yes")]
    pub available_for_order: bool,
    #[serde(default = "yes")]
    pub is_active: bool,
    pub assigned_staff: Option<UserId>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        NewProduct {
            description: req.description,
            old_price: req.old_price_paisa.map(Money::from_paisa),
            image: req.image.filter(|i| !i.trim().is_empty()),
            is_featured: req.is_featured,
            is_popular: req.is_popular,
            is_special_offer: req.is_special_offer,
            available_for_order: req.available_for_order,
            is_active: req.is_active,
            assigned_staff: req.assigned_staff,
            ..NewProduct::new(
                req.name,
                req.category,
                Money::from_paisa(req.price_paisa),
                req.stock,
            )
        }
    }
}

/// Partial product edit. An empty `image` clears it; `clear_old_price`
/// and `unassign_staff` clear the other optional fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_paisa: Option<i64>,
    pub old_price_paisa: Option<i64>,
    pub clear_old_price: bool,
    pub stock: Option<u32>,
    pub category: Option<Category>,
    pub image: Option<String>,
    pub is_featured: Option<bool>,
    pub is_popular: Option<bool>,
    pub is_special_offer: Option<bool>,
    pub available_for_order: Option<bool>,
    pub is_active: Option<bool>,
    pub assigned_staff: Option<UserId>,
    pub unassign_staff: bool,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(req: UpdateProductRequest) -> Self {
        let old_price = if req.clear_old_price {
            Some(None)
        } else {
            req.old_price_paisa.map(|p| Some(Money::from_paisa(p)))
        };
        let assigned_staff = if req.unassign_staff {
            Some(None)
        } else {
            req.assigned_staff.map(Some)
        };
        ProductUpdate {
            name: req.name,
            description: req.description,
            price: req.price_paisa.map(Money::from_paisa),
            old_price,
            stock: req.stock,
            category: req.category,
            image: req
                .image
                .map(|image| Some(image).filter(|i| !i.trim().is_empty())),
            is_featured: req.is_featured,
            is_popular: req.is_popular,
            is_special_offer: req.is_special_offer,
            available_for_order: req.available_for_order,
            is_active: req.is_active,
            assigned_staff,
        }
    }
}

// -- Public handlers --

/// GET /home: site content with featured, popular and discounted products.
pub async fn home<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<HomePage>, ApiError> {
    Ok(Json(state.catalog.home_page().await?))
}

/// GET /products: active products, filtered.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let query = query.into_query(ProductQuery::storefront())?;
    Ok(Json(state.catalog.products(query).await?))
}

/// GET /products/{id}
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id)?;
    Ok(Json(state.catalog.storefront_product(id).await?))
}

/// GET /categories/{category}: accepts labels or slugs like `living-room`.
pub async fn category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let category: Category = category
        .parse()
        .map_err(|e: domain::CatalogError| ApiError::NotFound(e.to_string()))?;
    Ok(Json(state.catalog.category(category).await?))
}

/// GET /search?q=
pub async fn search<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.search(&query.q).await?))
}

/// GET /site-content
pub async fn site_content<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SiteContent>, ApiError> {
    Ok(Json(state.catalog.site_content().await?))
}

// -- Staff handlers --

/// POST /staff/products/{id}/stock: `{"set": n}`, `"increase"` or `"decrease"`.
#[tracing::instrument(skip(state, staff), fields(staff_id = %staff.0.id))]
pub async fn adjust_stock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    staff: StaffUser,
    Path(id): Path<String>,
    Json(adjustment): Json<StockAdjustment>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id)?;
    Ok(Json(state.catalog.adjust_stock(id, adjustment).await?))
}

// -- Admin handlers --

/// GET /admin/products: every product, hidden ones included.
pub async fn admin_list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let query = query.into_query(ProductQuery::new())?;
    Ok(Json(state.catalog.products(query).await?))
}

/// POST /admin/products
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(req.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /admin/products/{id}
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id)?;
    Ok(Json(state.catalog.update_product(id, req.into()).await?))
}

/// DELETE /admin/products/{id}
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ProductId = parse_id(&id)?;
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/products/{id}/toggle
pub async fn toggle_active<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id)?;
    Ok(Json(state.catalog.toggle_active(id).await?))
}

/// PUT /admin/site-content
pub async fn update_site_content<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Json(update): Json<SiteContentUpdate>,
) -> Result<Json<SiteContent>, ApiError> {
    Ok(Json(state.catalog.update_site_content(update).await?))
}
