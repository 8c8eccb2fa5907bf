use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{CatalogError, Category};
use crate::money::Money;

/// A product listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    /// Previous price, shown struck through when the product is on sale.
    pub old_price: Option<Money>,
    pub stock: u32,
    pub category: Category,
    pub image: Option<String>,
    pub is_featured: bool,
    pub is_popular: bool,
    pub is_special_offer: bool,
    pub available_for_order: bool,
    pub is_active: bool,
    /// Staff member responsible for the listing.
    pub assigned_staff: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub old_price: Option<Money>,
    pub stock: u32,
    pub category: Category,
    pub image: Option<String>,
    pub is_featured: bool,
    pub is_popular: bool,
    pub is_special_offer: bool,
    pub available_for_order: bool,
    pub is_active: bool,
    pub assigned_staff: Option<UserId>,
}

impl NewProduct {
    /// Creates input with the required fields; flags default to an active,
    /// orderable, unpromoted listing.
    pub fn new(name: impl Into<String>, category: Category, price: Money, stock: u32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            price,
            old_price: None,
            stock,
            category,
            image: None,
            is_featured: false,
            is_popular: false,
            is_special_offer: false,
            available_for_order: true,
            is_active: true,
            assigned_staff: None,
        }
    }
}

/// Partial update of a product. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    /// `Some(None)` clears the old price.
    pub old_price: Option<Option<Money>>,
    pub stock: Option<u32>,
    pub category: Option<Category>,
    pub image: Option<Option<String>>,
    pub is_featured: Option<bool>,
    pub is_popular: Option<bool>,
    pub is_special_offer: Option<bool>,
    pub available_for_order: Option<bool>,
    pub is_active: Option<bool>,
    pub assigned_staff: Option<Option<UserId>>,
}

impl Product {
    /// Validates the input and builds a new product.
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> Result<Self, CatalogError> {
        let product = Self {
            id: ProductId::new(),
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            old_price: input.old_price,
            stock: input.stock,
            category: input.category,
            image: input.image,
            is_featured: input.is_featured,
            is_popular: input.is_popular,
            is_special_offer: input.is_special_offer,
            available_for_order: input.available_for_order,
            is_active: input.is_active,
            assigned_staff: input.assigned_staff,
            created_at: now,
        };
        product.validate()?;
        Ok(product)
    }

    /// Applies a partial update. The product is left unchanged on error.
    pub fn apply_update(&mut self, update: ProductUpdate) -> Result<(), CatalogError> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            next.description = description;
        }
        if let Some(price) = update.price {
            next.price = price;
        }
        if let Some(old_price) = update.old_price {
            next.old_price = old_price;
        }
        if let Some(stock) = update.stock {
            next.stock = stock;
        }
        if let Some(category) = update.category {
            next.category = category;
        }
        if let Some(image) = update.image {
            next.image = image;
        }
        if let Some(flag) = update.is_featured {
            next.is_featured = flag;
        }
        if let Some(flag) = update.is_popular {
            next.is_popular = flag;
        }
        if let Some(flag) = update.is_special_offer {
            next.is_special_offer = flag;
        }
        if let Some(flag) = update.available_for_order {
            next.available_for_order = flag;
        }
        if let Some(flag) = update.is_active {
            next.is_active = flag;
        }
        if let Some(staff) = update.assigned_staff {
            next.assigned_staff = staff;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if !self.price.is_positive() {
            return Err(CatalogError::InvalidPrice {
                price: self.price.paisa(),
            });
        }
        if let Some(old) = self.old_price
            && !old.is_positive()
        {
            return Err(CatalogError::InvalidPrice { price: old.paisa() });
        }
        Ok(())
    }

    /// Flips the storefront visibility flag.
    pub fn toggle_active(&mut self) {
        self.is_active = !self.is_active;
    }

    /// Returns true if customers can order this product.
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.available_for_order
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn is_on_sale(&self) -> bool {
        self.old_price.is_some_and(|old| old > self.price)
    }

    /// Whole-percent discount against the old price, if on sale.
    pub fn discount_percent(&self) -> Option<u8> {
        let old = self.old_price.filter(|_| self.is_on_sale())?;
        let saved = (old - self.price).paisa();
        u8::try_from(saved * 100 / old.paisa()).ok()
    }
}
