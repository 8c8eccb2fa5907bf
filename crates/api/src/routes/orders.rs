//! Checkout, customer order pages and the staff/admin order desk.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use common::{OrderId, UserId};
use domain::{
    Cart, CartLine, CheckoutRequest, DeliveryDetails, Order, OrderStatus, Payment, PaymentMethod,
    PaymentStatus, StatusChange,
};
use serde::Deserialize;
use services::{OrderDetail, OrderUpdate, PlacedOrder, ServiceError, StaffActivity};
use store::{OrderQuery, Store};

use super::{DEFAULT_LIMIT, LimitQuery, parse_id};
use crate::auth::{AdminUser, CurrentUser, StaffUser};
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

/// Checkout form. Only product ids and quantities are taken from the cart;
/// prices come from the catalog.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub items: Vec<CartLine>,
    pub payment_method: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub instructions: String,
    pub delivery_date: Option<NaiveDate>,
}

impl CheckoutForm {
    fn into_request(self) -> Result<CheckoutRequest, ServiceError> {
        let payment_method: PaymentMethod = self.payment_method.parse()?;
        Ok(CheckoutRequest {
            cart: Cart::new(self.items)?,
            payment_method,
            delivery: DeliveryDetails::new(self.address, self.phone, self.instructions)?,
            requested_delivery_date: self.delivery_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TrackOrderForm {
    pub tracking_number: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
}

/// Back-office order list filters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub assigned_to: Option<UserId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<OrderFilter> for OrderQuery {
    fn from(filter: OrderFilter) -> Self {
        let mut query = OrderQuery::new().limit(filter.limit.unwrap_or(DEFAULT_LIMIT));
        if let Some(status) = filter.status {
            query = query.status(status);
        }
        if let Some(status) = filter.payment_status {
            query = query.payment_status(status);
        }
        if let Some(staff) = filter.assigned_to {
            query = query.assigned_to(staff);
        }
        if let Some(from) = filter.from {
            query = query.from_date(from);
        }
        if let Some(to) = filter.to {
            query = query.to_date(to);
        }
        if let Some(offset) = filter.offset {
            query = query.offset(offset);
        }
        query
    }
}

// -- Customer handlers --

/// POST /checkout: places the order and, for eSewa or Khalti, returns
/// what the browser needs to continue to the gateway.
#[tracing::instrument(skip(state, user, form), fields(customer_id = %user.user.id))]
pub async fn checkout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(form): Json<CheckoutForm>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let request = form.into_request()?;
    let placed = state.checkout.place_order(user.user.id, request).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// GET /account/orders
pub async fn my_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.customer_orders(user.user.id).await?))
}

/// GET /account/orders/{id}
pub async fn my_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    Ok(Json(
        state.orders.customer_order_detail(user.user.id, id).await?,
    ))
}

/// POST /orders/track: public lookup by tracking number and phone.
pub async fn track<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(form): Json<TrackOrderForm>,
) -> Result<Json<OrderDetail>, ApiError> {
    Ok(Json(
        state
            .orders
            .track_order(&form.tracking_number, &form.phone)
            .await?,
    ))
}

// -- Staff handlers --

/// GET /staff/orders: pending orders first.
pub async fn queue<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _staff: StaffUser,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.order_queue(filter.into()).await?))
}

/// GET /staff/orders/{id}
pub async fn detail<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    Ok(Json(state.orders.order_detail(id).await?))
}

/// POST /staff/orders/{id}/status
#[tracing::instrument(skip(state, staff, form), fields(staff_id = %staff.0.id))]
pub async fn change_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    staff: StaffUser,
    Path(id): Path<String>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    let order = state
        .orders
        .change_status(staff.0.id, id, form.status, form.notes)
        .await?;
    Ok(Json(order))
}

/// GET /staff/activity: the signed-in staff member's dashboard.
pub async fn activity<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    staff: StaffUser,
) -> Result<Json<StaffActivity>, ApiError> {
    Ok(Json(state.orders.staff_activity(staff.0.id).await?))
}

// -- Admin handlers --

/// PUT /admin/orders/{id}: status and payment status in one edit.
pub async fn admin_update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    Json(update): Json<OrderUpdate>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id(&id)?;
    Ok(Json(state.orders.update_order(admin.0.id, id, update).await?))
}

/// GET /admin/history: latest status changes across all orders.
pub async fn history<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<StatusChange>>, ApiError> {
    Ok(Json(state.orders.history(query.limit()).await?))
}

/// GET /admin/payments
pub async fn payments<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    Ok(Json(state.orders.payments(query.limit()).await?))
}
