use async_trait::async_trait;
use common::{ProductId, UserId};
use domain::{Money, Product, StockAdjustment};
use sqlx::{Row, postgres::PgRow};
use uuid::Uuid;

use super::{PostgresStore, parse_column, to_i32, to_limit, to_u32};
use crate::{CatalogStore, ProductQuery, Result, StoreError};

pub(super) const PRODUCT_COLUMNS: &str = "id, name, description, price_paisa, old_price_paisa, \
     stock, category, image, is_featured, is_popular, is_special_offer, available_for_order, \
     is_active, assigned_staff, created_at";

pub(super) fn row_to_product(row: &PgRow) -> Result<Product> {
    let category: String = row.try_get("category")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_paisa(row.try_get("price_paisa")?),
        old_price: row
            .try_get::<Option<i64>, _>("old_price_paisa")?
            .map(Money::from_paisa),
        stock: to_u32(row.try_get("stock")?, "stock")?,
        category: parse_column(&category)?,
        image: row.try_get("image")?,
        is_featured: row.try_get("is_featured")?,
        is_popular: row.try_get("is_popular")?,
        is_special_offer: row.try_get("is_special_offer")?,
        available_for_order: row.try_get("available_for_order")?,
        is_active: row.try_get("is_active")?,
        assigned_staff: row
            .try_get::<Option<Uuid>, _>("assigned_staff")?
            .map(UserId::from_uuid),
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_product(&self, product: Product) -> Result<Product> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_paisa, old_price_paisa, stock,
                category, image, is_featured, is_popular, is_special_offer, available_for_order,
                is_active, assigned_staff, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.paisa())
        .bind(product.old_price.map(|p| p.paisa()))
        .bind(to_i32(product.stock, "stock")?)
        .bind(product.category.as_str())
        .bind(&product.image)
        .bind(product.is_featured)
        .bind(product.is_popular)
        .bind(product.is_special_offer)
        .bind(product.available_for_order)
        .bind(product.is_active)
        .bind(product.assigned_staff.map(|id| id.as_uuid()))
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))?;
        row_to_product(&row)
    }

    async fn update_product(&self, product: Product) -> Result<Product> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $2, description = $3, price_paisa = $4, old_price_paisa = $5, stock = $6,
                category = $7, image = $8, is_featured = $9, is_popular = $10,
                is_special_offer = $11, available_for_order = $12, is_active = $13,
                assigned_staff = $14
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.paisa())
        .bind(product.old_price.map(|p| p.paisa()))
        .bind(to_i32(product.stock, "stock")?)
        .bind(product.category.as_str())
        .bind(&product.image)
        .bind(product.is_featured)
        .bind(product.is_popular)
        .bind(product.is_special_offer)
        .bind(product.available_for_order)
        .bind(product.is_active)
        .bind(product.assigned_staff.map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", product.id));
        }
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }
        Ok(())
    }

    async fn query_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.active_only {
            sql.push_str(" AND is_active");
        }
        if query.featured_only {
            sql.push_str(" AND is_featured");
        }
        if query.popular_only {
            sql.push_str(" AND is_popular");
        }
        if query.special_offers_only {
            sql.push_str(" AND is_special_offer");
        }
        if query.category.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category = ${param_count}"));
        }
        if query.search.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND name ILIKE ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        // Build and execute query with parameters
        let mut sqlx_query = sqlx::query(&sql);

        if let Some(category) = query.category {
            sqlx_query = sqlx_query.bind(category.as_str());
        }
        if let Some(term) = &query.search {
            sqlx_query = sqlx_query.bind(format!("%{}%", escape_like(term)));
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(to_limit(limit));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(to_limit(offset));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn adjust_stock(&self, id: ProductId, adjustment: StockAdjustment) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))?;
        let mut product = row_to_product(&row)?;
        product.stock = adjustment.apply(product.stock)?;

        sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(to_i32(product.stock, "stock")?)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(product)
    }
}

/// Escapes `LIKE` wildcards so search terms match literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
