use async_trait::async_trait;
use common::{AddressId, ProductId, UserId};
use domain::{Address, SavedItem};
use sqlx::{PgConnection, Row, postgres::PgRow};
use uuid::Uuid;

use super::PostgresStore;
use crate::{CustomerStore, Result, StoreError};

pub(super) const ADDRESS_COLUMNS: &str = "id, user_id, label, full_name, phone, line1, line2, \
     city, state, postal_code, is_default, created_at";

pub(super) fn row_to_address(row: &PgRow) -> Result<Address> {
    Ok(Address {
        id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        label: row.try_get("label")?,
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        line1: row.try_get("line1")?,
        line2: row.try_get("line2")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        postal_code: row.try_get("postal_code")?,
        is_default: row.try_get("is_default")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(super) async fn insert_address(conn: &mut PgConnection, address: &Address) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO addresses (id, user_id, label, full_name, phone, line1, line2, city, state,
            postal_code, is_default, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE SET
            label = EXCLUDED.label,
            full_name = EXCLUDED.full_name,
            phone = EXCLUDED.phone,
            line1 = EXCLUDED.line1,
            line2 = EXCLUDED.line2,
            city = EXCLUDED.city,
            state = EXCLUDED.state,
            postal_code = EXCLUDED.postal_code,
            is_default = EXCLUDED.is_default
        "#,
    )
    .bind(address.id.as_uuid())
    .bind(address.user_id.as_uuid())
    .bind(&address.label)
    .bind(&address.full_name)
    .bind(&address.phone)
    .bind(&address.line1)
    .bind(&address.line2)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postal_code)
    .bind(address.is_default)
    .bind(address.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn row_to_saved_item(row: &PgRow) -> Result<SavedItem> {
    Ok(SavedItem {
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CustomerStore for PostgresStore {
    async fn save_address(&self, address: Address) -> Result<Address> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM addresses WHERE id = $1")
            .bind(address.id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        if owner.is_some_and(|owner| owner != address.user_id.as_uuid()) {
            return Err(StoreError::not_found("Address", address.id));
        }

        if address.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND id <> $2")
                .bind(address.user_id.as_uuid())
                .bind(address.id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }
        insert_address(&mut tx, &address).await?;

        tx.commit().await?;
        Ok(address)
    }

    async fn list_addresses(&self, user_id: UserId) -> Result<Vec<Address>> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 \
             ORDER BY is_default DESC, created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_address).collect()
    }

    async fn get_address(&self, user_id: UserId, id: AddressId) -> Result<Address> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("Address", id))?;
        row_to_address(&row)
    }

    async fn delete_address(&self, user_id: UserId, id: AddressId) -> Result<()> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Address", id));
        }
        Ok(())
    }

    async fn add_saved_item(&self, user_id: UserId, product_id: ProductId) -> Result<SavedItem> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(StoreError::not_found("Product", product_id));
        }

        sqlx::query(
            r#"
            INSERT INTO saved_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT saved_items_pkey DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT user_id, product_id, created_at FROM saved_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        row_to_saved_item(&row)
    }

    async fn remove_saved_item(&self, user_id: UserId, product_id: ProductId) -> Result<()> {
        sqlx::query("DELETE FROM saved_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_saved_items(&self, user_id: UserId) -> Result<Vec<SavedItem>> {
        let rows = sqlx::query(
            "SELECT user_id, product_id, created_at FROM saved_items WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_saved_item).collect()
    }
}
