//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CheckoutError, DomainError};
use payments::GatewayError;
use services::ServiceError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Missing or expired session.
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    /// Stock, lifecycle or uniqueness conflict.
    #[error("{0}")]
    Conflict(String),
    /// A payment gateway failed or could not be reached.
    #[error("{0}")]
    BadGateway(String),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => {
                tracing::warn!(error = %msg, "payment gateway error");
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Store(err) => store_error(err),
            ServiceError::Gateway(err) => gateway_error(err),
            ServiceError::Domain(err) => domain_error(&err, message),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Invalid(msg) => ApiError::BadRequest(msg),
            ServiceError::InvalidCredentials | ServiceError::Unauthenticated => {
                ApiError::Unauthorized(message)
            }
            ServiceError::PendingApproval
            | ServiceError::AccountDisabled
            | ServiceError::Forbidden(_) => ApiError::Forbidden(message),
            ServiceError::PaymentNotCompleted { .. } | ServiceError::AmountMismatch { .. } => {
                ApiError::BadRequest(message)
            }
        }
    }
}

fn store_error(err: StoreError) -> ApiError {
    let message = err.to_string();
    match err {
        StoreError::NotFound { .. } => ApiError::NotFound(message),
        StoreError::Conflict(msg) => ApiError::Conflict(msg),
        StoreError::Checkout(err) => domain_error(&DomainError::Checkout(err), message),
        StoreError::Order(err) => domain_error(&DomainError::Order(err), message),
        StoreError::Catalog(_) | StoreError::Account(_) | StoreError::Shipment(_) => {
            ApiError::BadRequest(message)
        }
        StoreError::Database(_)
        | StoreError::Migration(_)
        | StoreError::Serialization(_)
        | StoreError::Corrupt(_) => ApiError::Internal(message),
    }
}

fn domain_error(err: &DomainError, message: String) -> ApiError {
    match err {
        DomainError::Checkout(
            CheckoutError::InsufficientStock { .. } | CheckoutError::ProductUnavailable { .. },
        ) => ApiError::Conflict(message),
        DomainError::Checkout(CheckoutError::ProductNotFound { .. }) => ApiError::NotFound(message),
        _ => ApiError::BadRequest(message),
    }
}

fn gateway_error(err: GatewayError) -> ApiError {
    let message = err.to_string();
    match err {
        GatewayError::Request(_) | GatewayError::Rejected { .. } | GatewayError::InvalidResponse(_) => {
            ApiError::BadGateway(message)
        }
        GatewayError::InvalidSignature
        | GatewayError::InvalidReference(_)
        | GatewayError::Declined(_)
        | GatewayError::Unsupported(_) => ApiError::BadRequest(message),
    }
}
