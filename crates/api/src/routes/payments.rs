//! Gateway return redirects and the payment success page.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use common::OrderId;
use serde::Deserialize;
use services::{ConfirmedPayment, PaymentReceipt};
use store::Store;

use super::parse_id;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReceiptQuery {
    pub order_id: String,
}

/// GET /payments/esewa/callback?data=...: eSewa's base64 JSON redirect.
///
/// The payload's signature is checked and the transaction is re-verified
/// with eSewa before the order is marked paid.
#[tracing::instrument(skip(state, params))]
pub async fn esewa_callback<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ConfirmedPayment>, ApiError> {
    Ok(Json(state.checkout.confirm_esewa(&params).await?))
}

/// GET /payments/khalti/verify?pidx=...&purchase_order_id=...
#[tracing::instrument(skip(state, params))]
pub async fn khalti_verify<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ConfirmedPayment>, ApiError> {
    Ok(Json(state.checkout.confirm_khalti(&params).await?))
}

/// GET /payments/success?order_id=
pub async fn success<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Query(query): Query<ReceiptQuery>,
) -> Result<Json<PaymentReceipt>, ApiError> {
    let order_id: OrderId = parse_id(&query.order_id)?;
    Ok(Json(
        state
            .checkout
            .payment_receipt(user.user.id, order_id)
            .await?,
    ))
}
