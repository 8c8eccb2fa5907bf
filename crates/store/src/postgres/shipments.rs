use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ShipmentId};
use domain::{Shipment, TrackingEvent};
use sqlx::{PgConnection, Row, postgres::PgRow};
use uuid::Uuid;

use super::{PostgresStore, map_unique_violation};
use crate::{Result, ShipmentStore, StoreError};

const SHIPMENT_COLUMNS: &str = "id, order_id, tracking_number, current_location, \
     current_status, history, is_active, created_at, updated_at";

fn row_to_shipment(row: &PgRow) -> Result<Shipment> {
    let history: serde_json::Value = row.try_get("history")?;
    let history: Vec<TrackingEvent> = serde_json::from_value(history)?;
    Ok(Shipment {
        id: ShipmentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        tracking_number: row.try_get("tracking_number")?,
        current_location: row.try_get("current_location")?,
        current_status: row.try_get("current_status")?,
        history,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn fetch_shipment(
    conn: &mut PgConnection,
    column: &str,
    value: Uuid,
    lock: bool,
) -> Result<Option<Shipment>> {
    let sql = format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE {column} = $1{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(row_to_shipment).transpose()
}

#[async_trait]
impl ShipmentStore for PostgresStore {
    async fn insert_shipment(&self, shipment: Shipment) -> Result<Shipment> {
        sqlx::query(
            r#"
            INSERT INTO shipments (id, order_id, tracking_number, current_location,
                current_status, history, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(shipment.id.as_uuid())
        .bind(shipment.order_id.as_uuid())
        .bind(&shipment.tracking_number)
        .bind(&shipment.current_location)
        .bind(&shipment.current_status)
        .bind(serde_json::to_value(&shipment.history)?)
        .bind(shipment.is_active)
        .bind(shipment.created_at)
        .bind(shipment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::not_found("Order", shipment.order_id);
            }
            map_unique_violation(e)
        })?;
        Ok(shipment)
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Shipment> {
        let mut conn = self.pool.acquire().await?;
        fetch_shipment(&mut conn, "id", id.as_uuid(), false)
            .await?
            .ok_or_else(|| StoreError::not_found("Shipment", id))
    }

    async fn find_shipment_by_number(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE tracking_number = $1");
        let row = sqlx::query(&sql)
            .bind(tracking_number)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_shipment).transpose()
    }

    async fn find_shipment_for_order(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_shipment(&mut conn, "order_id", order_id.as_uuid(), false).await
    }

    async fn add_tracking_event(
        &self,
        id: ShipmentId,
        location: String,
        status: String,
        description: String,
    ) -> Result<Shipment> {
        let mut tx = self.pool.begin().await?;

        let mut shipment = fetch_shipment(&mut tx, "id", id.as_uuid(), true)
            .await?
            .ok_or_else(|| StoreError::not_found("Shipment", id))?;
        shipment.add_event(&location, &status, &description, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE shipments SET current_location = $2, current_status = $3, history = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&shipment.current_location)
        .bind(&shipment.current_status)
        .bind(serde_json::to_value(&shipment.history)?)
        .bind(shipment.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(shipment)
    }
}
