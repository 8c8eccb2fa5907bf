//! Saved addresses, saved items and notifications of the signed-in user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{AddressId, NotificationId, ProductId};
use domain::{Address, AddressDraft, Notification};
use serde::{Deserialize, Serialize};
use services::SavedProduct;
use store::Store;

use super::parse_id;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveItemForm {
    pub product_id: ProductId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotificationFilter {
    pub unread: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

// -- Addresses --

/// GET /account/addresses: default first.
pub async fn addresses<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<Address>>, ApiError> {
    Ok(Json(state.customers.addresses(user.user.id).await?))
}

/// POST /account/addresses
pub async fn add_address<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(draft): Json<AddressDraft>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    let address = state.customers.add_address(user.user.id, draft).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// PUT /account/addresses/{id}
pub async fn update_address<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(draft): Json<AddressDraft>,
) -> Result<Json<Address>, ApiError> {
    let id: AddressId = parse_id(&id)?;
    Ok(Json(
        state.customers.update_address(user.user.id, id, draft).await?,
    ))
}

/// DELETE /account/addresses/{id}
pub async fn delete_address<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: AddressId = parse_id(&id)?;
    state.customers.delete_address(user.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Saved items --

/// GET /account/saved-items
pub async fn saved_items<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<SavedProduct>>, ApiError> {
    Ok(Json(state.customers.saved_items(user.user.id).await?))
}

/// POST /account/saved-items: saving twice keeps one entry.
pub async fn save_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(form): Json<SaveItemForm>,
) -> Result<(StatusCode, Json<SavedProduct>), ApiError> {
    let saved = state
        .customers
        .save_item(user.user.id, form.product_id)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// DELETE /account/saved-items/{product_id}
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id: ProductId = parse_id(&product_id)?;
    state.customers.remove_item(user.user.id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Notifications --

/// GET /notifications?unread=true
pub async fn notifications<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Query(filter): Query<NotificationFilter>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(
        state
            .customers
            .notifications(user.user.id, filter.unread)
            .await?,
    ))
}

/// POST /notifications/{id}/read
pub async fn mark_read<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: NotificationId = parse_id(&id)?;
    state.customers.mark_read(user.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /notifications/read-all
pub async fn mark_all_read<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<MarkedRead>, ApiError> {
    let updated = state.customers.mark_all_read(user.user.id).await?;
    Ok(Json(MarkedRead { updated }))
}
