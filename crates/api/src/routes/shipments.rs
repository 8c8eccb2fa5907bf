//! Nepal Post shipment tracking.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, ShipmentId};
use domain::Shipment;
use services::{ShipmentTracking, TrackingUpdate};
use store::Store;

use super::parse_id;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /shipments/track/{number}: accepts an `NP-` or an `FNQ-` number.
pub async fn track<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(number): Path<String>,
) -> Result<Json<ShipmentTracking>, ApiError> {
    Ok(Json(state.shipments.track(&number).await?))
}

/// POST /admin/orders/{id}/shipment
pub async fn assign<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Shipment>), ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let shipment = state.shipments.assign(order_id).await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// POST /admin/shipments/{id}/events
pub async fn add_event<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(update): Json<TrackingUpdate>,
) -> Result<Json<Shipment>, ApiError> {
    let shipment_id: ShipmentId = parse_id(&id)?;
    Ok(Json(
        state
            .shipments
            .add_tracking_event(shipment_id, update)
            .await?,
    ))
}
