//! Bearer-session extractors.
//!
//! Handlers take [`CurrentUser`], [`StaffUser`] or [`AdminUser`] to require
//! a signed-in user, back-office access or admin rights respectively.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::User;
use store::Store;

use crate::error::ApiError;
use crate::state::AppState;

/// A signed-in user and the token they signed in with.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// An admin or an approved staff member.
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state.accounts.authenticate(&token).await?;
        Ok(CurrentUser { user, token })
    }
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        state.accounts.authorize_back_office(&user).await?;
        Ok(StaffUser(user))
    }
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        state.accounts.require_admin(&user)?;
        Ok(AdminUser(user))
    }
}
