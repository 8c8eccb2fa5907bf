use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, PaymentId, ProductId, StatusChangeId, UserId};
use domain::{
    Address, CheckoutRequest, DeliveryDetails, Money, Notification, Order, OrderLine, OrderStatus,
    Payment, PaymentMethod, PaymentStatus, StatusChange, TrackingNumber, price_lines,
};
use sqlx::{PgConnection, Row, postgres::PgExecutor, postgres::PgRow};
use uuid::Uuid;

use super::catalog::{PRODUCT_COLUMNS, row_to_product};
use super::customers::{insert_address, row_to_address};
use super::notifications::insert_notification;
use super::{PostgresStore, map_unique_violation, parse_column, to_i32, to_limit, to_u32};
use crate::{OrderQuery, OrderStore, Result, StoreError};

const ORDER_COLUMNS: &str = "id, customer_id, items_summary, total_paisa, order_date, status, \
     payment_method, payment_status, delivery_address, delivery_phone, delivery_instructions, \
     tracking_number, estimated_delivery_date, assigned_staff, updated_at";

const HISTORY_COLUMNS: &str = "id, order_id, old_status, new_status, changed_by, changed_at, notes";

const PAYMENT_COLUMNS: &str =
    "id, order_id, transaction_id, method, amount_paisa, status, created_at, response_data";

fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let payment_method: String = row.try_get("payment_method")?;
    let payment_status: String = row.try_get("payment_status")?;
    let tracking: String = row.try_get("tracking_number")?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        customer_id: UserId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
        lines,
        items_summary: row.try_get("items_summary")?,
        total: Money::from_paisa(row.try_get("total_paisa")?),
        order_date: row.try_get("order_date")?,
        status: parse_column(&status)?,
        payment_method: parse_column(&payment_method)?,
        payment_status: parse_column(&payment_status)?,
        delivery: DeliveryDetails {
            address: row.try_get("delivery_address")?,
            phone: row.try_get("delivery_phone")?,
            instructions: row.try_get("delivery_instructions")?,
        },
        tracking_number: parse_column::<TrackingNumberColumn>(&tracking)?.0,
        estimated_delivery_date: row.try_get("estimated_delivery_date")?,
        assigned_staff: row
            .try_get::<Option<Uuid>, _>("assigned_staff")?
            .map(UserId::from_uuid),
        updated_at: row.try_get("updated_at")?,
    })
}

/// Adapter so tracking numbers parse through [`parse_column`].
struct TrackingNumberColumn(TrackingNumber);

impl std::str::FromStr for TrackingNumberColumn {
    type Err = domain::OrderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TrackingNumber::parse(s).map(Self)
    }
}

fn row_to_line(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: Money::from_paisa(row.try_get("unit_price_paisa")?),
    })
}

fn row_to_change(row: &PgRow) -> Result<StatusChange> {
    let old_status: String = row.try_get("old_status")?;
    let new_status: String = row.try_get("new_status")?;
    Ok(StatusChange {
        id: StatusChangeId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        old_status: parse_column(&old_status)?,
        new_status: parse_column(&new_status)?,
        changed_by: row
            .try_get::<Option<Uuid>, _>("changed_by")?
            .map(UserId::from_uuid),
        changed_at: row.try_get("changed_at")?,
        notes: row.try_get("notes")?,
    })
}

fn row_to_payment(row: &PgRow) -> Result<Payment> {
    let method: String = row.try_get("method")?;
    let status: String = row.try_get("status")?;
    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        transaction_id: row.try_get("transaction_id")?,
        method: parse_column(&method)?,
        amount: Money::from_paisa(row.try_get("amount_paisa")?),
        status: parse_column(&status)?,
        created_at: row.try_get("created_at")?,
        response_data: row.try_get("response_data")?,
    })
}

/// Loads the lines of several orders, grouped by order id.
async fn fetch_lines<'e, E>(executor: E, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderLine>>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT order_id, product_id, product_name, quantity, unit_price_paisa
        FROM order_lines
        WHERE order_id = ANY($1)
        ORDER BY order_id, position
        "#,
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await?;

    let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for row in &rows {
        let order_id: Uuid = row.try_get("order_id")?;
        lines.entry(order_id).or_default().push(row_to_line(row)?);
    }
    Ok(lines)
}

/// Loads one order row (optionally locking it) together with its lines.
async fn load_order(conn: &mut PgConnection, id: OrderId, lock: bool) -> Result<Order> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::not_found("Order", id))?;
    let mut lines = fetch_lines(&mut *conn, &[id.as_uuid()]).await?;
    row_to_order(&row, lines.remove(&id.as_uuid()).unwrap_or_default())
}

/// Attaches lines to a batch of order rows.
async fn assemble_orders(pool: &sqlx::PgPool, rows: Vec<PgRow>) -> Result<Vec<Order>> {
    let ids = rows
        .iter()
        .map(|row| row.try_get::<Uuid, _>("id"))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut lines = fetch_lines(pool, &ids).await?;
    rows.iter()
        .zip(ids)
        .map(|(row, id)| row_to_order(row, lines.remove(&id).unwrap_or_default()))
        .collect()
}

async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, customer_id, items_summary, total_paisa, order_date, status,
            payment_method, payment_status, delivery_address, delivery_phone,
            delivery_instructions, tracking_number, estimated_delivery_date, assigned_staff,
            updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(order.id.as_uuid())
    .bind(order.customer_id.as_uuid())
    .bind(&order.items_summary)
    .bind(order.total.paisa())
    .bind(order.order_date)
    .bind(order.status.as_str())
    .bind(order.payment_method.as_str())
    .bind(order.payment_status.as_str())
    .bind(&order.delivery.address)
    .bind(&order.delivery.phone)
    .bind(&order.delivery.instructions)
    .bind(order.tracking_number.as_str())
    .bind(order.estimated_delivery_date)
    .bind(order.assigned_staff.map(|id| id.as_uuid()))
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(map_unique_violation)?;

    for (position, line) in order.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, position, product_id, product_name, quantity,
                unit_price_paisa)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(position as i32)
        .bind(line.product_id.as_uuid())
        .bind(&line.product_name)
        .bind(to_i32(line.quantity, "quantity")?)
        .bind(line.unit_price.paisa())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_payment(conn: &mut PgConnection, payment: &Payment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, order_id, transaction_id, method, amount_paisa, status,
            created_at, response_data)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(payment.id.as_uuid())
    .bind(payment.order_id.as_uuid())
    .bind(&payment.transaction_id)
    .bind(payment.method.as_str())
    .bind(payment.amount.paisa())
    .bind(payment.status.as_str())
    .bind(payment.created_at)
    .bind(&payment.response_data)
    .execute(&mut *conn)
    .await
    .map_err(map_unique_violation)?;
    Ok(())
}

async fn update_payment_status(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query("UPDATE orders SET payment_status = $2, updated_at = $3 WHERE id = $1")
        .bind(order.id.as_uuid())
        .bind(order.payment_status.as_str())
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn place_order(&self, customer_id: UserId, request: CheckoutRequest) -> Result<Order> {
        let start = Instant::now();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let full_name: String = sqlx::query_scalar("SELECT full_name FROM users WHERE id = $1")
            .bind(customer_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("User", customer_id))?;

        // Lock in ascending id order so concurrent checkouts cannot deadlock.
        let ids: Vec<Uuid> = request
            .cart
            .product_ids()
            .iter()
            .map(|id| id.as_uuid())
            .collect();
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE");
        let locked = sqlx::query(&sql)
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>>>()?;

        // Dropping `tx` on error rolls back and releases the locks.
        let lines = price_lines(&request.cart, &locked).inspect_err(|e| {
            tracing::debug!(%customer_id, reason = %e, "checkout refused");
        })?;
        let order = Order::place(
            customer_id,
            lines,
            request.payment_method,
            request.delivery,
            request.requested_delivery_date,
            now,
        )?;

        for line in &order.lines {
            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(line.product_id.as_uuid())
                .bind(to_i32(line.quantity, "quantity")?)
                .execute(&mut *tx)
                .await?;
        }

        insert_order(&mut tx, &order).await?;

        let sql = format!(
            "SELECT {} FROM addresses WHERE user_id = $1",
            super::customers::ADDRESS_COLUMNS
        );
        let known = sqlx::query(&sql)
            .bind(customer_id.as_uuid())
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(row_to_address)
            .collect::<Result<Vec<_>>>()?;
        if !known.iter().any(|a| a.covers(&order.delivery)) {
            let address = Address::from_delivery(customer_id, &full_name, &order.delivery, now);
            insert_address(&mut tx, &address).await?;
        }

        insert_notification(
            &mut tx,
            &Notification::new(customer_id, order.placed_notification(), now),
        )
        .await?;
        let staff: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM users WHERE role IN ('staff', 'admin') AND is_active",
        )
        .fetch_all(&mut *tx)
        .await?;
        let staff_message = order.staff_action_notification();
        for staff_id in staff {
            insert_notification(
                &mut tx,
                &Notification::new(UserId::from_uuid(staff_id), staff_message.clone(), now),
            )
            .await?;
        }

        tx.commit().await?;

        metrics::histogram!("store_checkout_transaction_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::debug!(
            order_id = %order.id,
            tracking_number = %order.tracking_number,
            lines = order.lines.len(),
            "order committed"
        );
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, id, false).await
    }

    async fn find_order_by_tracking(&self, tracking: &TrackingNumber) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE tracking_number = $1");
        let rows = sqlx::query(&sql)
            .bind(tracking.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(assemble_orders(&self.pool, rows).await?.into_iter().next())
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if query.payment_status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND payment_status = ${param_count}"));
        }
        if query.assigned_staff.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND assigned_staff = ${param_count}"));
        }
        if query.from_date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND order_date >= ${param_count}"));
        }
        if query.to_date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND order_date <= ${param_count}"));
        }

        sql.push_str(" ORDER BY ");
        if query.pending_first {
            sql.push_str("(status = 'Pending') DESC, ");
        }
        sql.push_str("order_date DESC, id ASC");

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

        if let Some(id) = query.customer_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(status) = query.payment_status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(id) = query.assigned_staff {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(from) = query.from_date {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.to_date {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(to_limit(limit));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(to_limit(offset));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        assemble_orders(&self.pool, rows).await
    }

    async fn change_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        actor: UserId,
        notes: String,
    ) -> Result<(Order, Option<StatusChange>)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut order = load_order(&mut tx, id, true).await?;
        let Some(change) = order.change_status(new_status, actor, notes, now) else {
            return Ok((order, None));
        };
        order.apply(&change);

        sqlx::query("UPDATE orders SET status = $2, assigned_staff = $3, updated_at = $4 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(order.status.as_str())
            .bind(order.assigned_staff.map(|staff| staff.as_uuid()))
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO order_status_history (id, order_id, old_status, new_status, changed_by,
                changed_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(change.id.as_uuid())
        .bind(change.order_id.as_uuid())
        .bind(change.old_status.as_str())
        .bind(change.new_status.as_str())
        .bind(change.changed_by.map(|staff| staff.as_uuid()))
        .bind(change.changed_at)
        .bind(&change.notes)
        .execute(&mut *tx)
        .await?;

        insert_notification(
            &mut tx,
            &Notification::new(order.customer_id, order.status_notification(new_status), now),
        )
        .await?;

        tx.commit().await?;
        Ok((order, Some(change)))
    }

    async fn status_history(&self, id: OrderId) -> Result<Vec<StatusChange>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM order_status_history WHERE order_id = $1 \
             ORDER BY changed_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_change).collect()
    }

    async fn history_by_actor(&self, actor: UserId, limit: usize) -> Result<Vec<StatusChange>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM order_status_history WHERE changed_by = $1 \
             ORDER BY changed_at DESC LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(actor.as_uuid())
            .bind(to_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_change).collect()
    }

    async fn all_history(&self, limit: usize) -> Result<Vec<StatusChange>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM order_status_history ORDER BY changed_at DESC LIMIT $1"
        );
        let rows = sqlx::query(&sql)
            .bind(to_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_change).collect()
    }

    async fn set_payment_status(&self, id: OrderId, status: PaymentStatus) -> Result<Order> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut order = load_order(&mut tx, id, true).await?;
        order.set_payment_status(status, now);
        update_payment_status(&mut tx, &order).await?;

        let latest: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM payments WHERE order_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        match latest {
            Some(payment_id) => {
                sqlx::query("UPDATE payments SET status = $2 WHERE id = $1")
                    .bind(payment_id)
                    .bind(status.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                let payment =
                    Payment::manual(id, order.payment_method, order.total, status, now);
                insert_payment(&mut tx, &payment).await?;
            }
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn complete_payment(
        &self,
        id: OrderId,
        method: PaymentMethod,
        transaction_id: String,
        response_data: serde_json::Value,
    ) -> Result<Payment> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut order = load_order(&mut tx, id, true).await?;

        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = $1");
        if let Some(row) = sqlx::query(&sql)
            .bind(&transaction_id)
            .fetch_optional(&mut *tx)
            .await?
        {
            let existing = row_to_payment(&row)?;
            if existing.order_id != id {
                return Err(StoreError::Conflict(format!(
                    "Transaction {transaction_id} is already recorded for another order"
                )));
            }
            return Ok(existing);
        }

        order.set_payment_status(PaymentStatus::Completed, now);
        update_payment_status(&mut tx, &order).await?;

        let payment =
            Payment::completed(id, method, order.total, transaction_id, response_data, now);
        insert_payment(&mut tx, &payment).await?;

        tx.commit().await?;
        Ok(payment)
    }

    async fn payments_for_order(&self, id: OrderId) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn list_payments(&self, limit: usize) -> Result<Vec<Payment>> {
        let sql =
            format!("SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC LIMIT $1");
        let rows = sqlx::query(&sql)
            .bind(to_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_payment).collect()
    }
}
