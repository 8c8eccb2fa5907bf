//! Sign-up, sign-in, the user's own profile and admin account management.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::UserId;
use domain::Registration;
use serde::Deserialize;
use services::{AccountSummary, AccountUpdate, NewAccount, PasswordChange, ProfileUpdate, SignedIn};
use store::Store;

use super::parse_id;
use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileFilter {
    pub pending: bool,
}

// -- Session handlers --

/// POST /auth/register: customers are active at once; staff wait for an
/// admin's approval.
pub async fn register<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<AccountSummary>), ApiError> {
    let account = state.accounts.register(form).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /auth/login
pub async fn login<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(form): Json<LoginForm>,
) -> Result<Json<SignedIn>, ApiError> {
    Ok(Json(state.accounts.login(&form.email, &form.password).await?))
}

/// POST /auth/logout
pub async fn logout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.accounts.logout(&user.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Own account --

/// GET /account/profile
pub async fn profile<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<AccountSummary>, ApiError> {
    Ok(Json(state.accounts.profile(user.user.id).await?))
}

/// PUT /account/profile
pub async fn update_profile<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<AccountSummary>, ApiError> {
    Ok(Json(
        state.accounts.update_profile(user.user.id, update).await?,
    ))
}

/// POST /account/password
pub async fn change_password<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(change): Json<PasswordChange>,
) -> Result<StatusCode, ApiError> {
    state.accounts.change_password(user.user.id, change).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Admin: staff approval --

/// GET /admin/profiles?pending=true
pub async fn profiles<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Query(filter): Query<ProfileFilter>,
) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    Ok(Json(state.accounts.profiles(filter.pending).await?))
}

/// POST /admin/profiles/{id}/approve
pub async fn approve<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<AccountSummary>, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(state.accounts.approve_profile(id).await?))
}

/// POST /admin/profiles/{id}/reject
pub async fn reject<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<AccountSummary>, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(state.accounts.reject_profile(id).await?))
}

// -- Admin: users --

/// GET /admin/users
pub async fn users<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    Ok(Json(state.accounts.users().await?))
}

/// POST /admin/users
pub async fn create_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Json(account): Json<NewAccount>,
) -> Result<(StatusCode, Json<AccountSummary>), ApiError> {
    let account = state.accounts.create_user(account).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// PUT /admin/users/{id}
pub async fn update_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<AccountSummary>, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(state.accounts.update_user(admin.0.id, id, update).await?))
}

/// DELETE /admin/users/{id}
pub async fn delete_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: UserId = parse_id(&id)?;
    state.accounts.delete_user(admin.0.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/users/{id}/toggle-staff
pub async fn toggle_staff<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<AccountSummary>, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(state.accounts.toggle_staff(admin.0.id, id).await?))
}
