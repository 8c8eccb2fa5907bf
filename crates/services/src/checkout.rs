//! Checkout coordinator: places orders and settles online payments.

use std::collections::HashMap;

use common::{OrderId, UserId};
use domain::{CheckoutRequest, Order, Payment, PaymentMethod, PaymentStatus};
use payments::{
    CustomerInfo, GatewayRegistry, PaymentInitiation, PaymentRequest, VerificationOutcome,
    VerifyRequest,
};
use serde::Serialize;
use store::{AccountStore, OrderStore, OrderStoreExt, Store, StoreError};

use crate::error::{Result, ServiceError};

/// Where the gateways send the customer back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub esewa_success: String,
    pub esewa_failure: String,
    pub khalti_return: String,
}

impl CallbackUrls {
    /// Callback routes under the storefront's public base URL.
    pub fn from_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            esewa_success: format!("{base}/payments/esewa/callback"),
            esewa_failure: format!("{base}/payments/esewa/callback?status=failed"),
            khalti_return: format!("{base}/payments/khalti/verify"),
        }
    }
}

/// A freshly placed order and, for online methods, how to pay for it.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment: Option<PaymentInitiation>,
}

/// Result of a verified gateway payment.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedPayment {
    pub order: Order,
    pub payment: Payment,
}

/// An order with its payment records, as shown after paying.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub order: Order,
    pub payments: Vec<Payment>,
}

/// Orchestrates checkout: the atomic order placement in the store followed
/// by the gateway step for online payments.
///
/// A gateway failure never undoes the order. The order stays Pending with
/// its payment marked Failed, and the stock stays reserved for staff to
/// resolve.
pub struct CheckoutCoordinator<S: Store> {
    store: S,
    gateways: GatewayRegistry,
    urls: CallbackUrls,
}

impl<S: Store> CheckoutCoordinator<S> {
    pub fn new(store: S, gateways: GatewayRegistry, urls: CallbackUrls) -> Self {
        Self {
            store,
            gateways,
            urls,
        }
    }

    /// Places an order and prepares its payment.
    #[tracing::instrument(skip(self, request), fields(payment_method = %request.payment_method))]
    pub async fn place_order(
        &self,
        customer_id: UserId,
        request: CheckoutRequest,
    ) -> Result<PlacedOrder> {
        metrics::counter!("checkout_attempts_total").increment(1);

        let order = match self.store.place_order(customer_id, request).await {
            Ok(order) => order,
            Err(err) => {
                metrics::counter!("checkout_failures_total", "reason" => failure_reason(&err))
                    .increment(1);
                tracing::warn!(error = %err, "checkout refused");
                return Err(err.into());
            }
        };

        metrics::counter!("orders_placed_total", "payment_method" => order.payment_method.as_str())
            .increment(1);
        tracing::info!(
            order_id = %order.id,
            tracking_number = %order.tracking_number,
            total = %order.total,
            "order placed"
        );

        let payment = match order.payment_method {
            PaymentMethod::Cod => None,
            method => Some(self.initiate_payment(&order, method).await?),
        };
        Ok(PlacedOrder { order, payment })
    }

    async fn initiate_payment(
        &self,
        order: &Order,
        method: PaymentMethod,
    ) -> Result<PaymentInitiation> {
        let customer = self.store.get_user(order.customer_id).await?;
        let (return_url, failure_url) = match method {
            PaymentMethod::Esewa => (&self.urls.esewa_success, &self.urls.esewa_failure),
            _ => (&self.urls.khalti_return, &self.urls.khalti_return),
        };
        let request = PaymentRequest {
            order_id: order.id,
            tracking_number: order.tracking_number.to_string(),
            amount: order.total,
            customer: CustomerInfo {
                name: customer.full_name,
                email: customer.email,
                phone: order.delivery.phone.clone(),
            },
            return_url: return_url.clone(),
            failure_url: failure_url.clone(),
        };

        let initiated = match self.gateways.get(method) {
            Ok(gateway) => gateway.initiate(request).await,
            Err(err) => Err(err),
        };
        match initiated {
            Ok(initiation) => Ok(initiation),
            Err(err) => {
                metrics::counter!("payments_failed_total", "gateway" => method.as_str())
                    .increment(1);
                tracing::error!(
                    order_id = %order.id,
                    error = %err,
                    "payment initiation failed; order kept with failed payment"
                );
                self.store
                    .set_payment_status(order.id, PaymentStatus::Failed)
                    .await?;
                Err(err.into())
            }
        }
    }

    /// Handles eSewa's return redirect.
    pub async fn confirm_esewa(&self, params: &HashMap<String, String>) -> Result<ConfirmedPayment> {
        self.confirm_payment(PaymentMethod::Esewa, params).await
    }

    /// Handles Khalti's return redirect.
    pub async fn confirm_khalti(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<ConfirmedPayment> {
        self.confirm_payment(PaymentMethod::Khalti, params).await
    }

    /// Verifies a gateway callback server-side and records the payment.
    ///
    /// The callback itself is never trusted: the gateway is asked for the
    /// transaction status and the settled amount must equal the order
    /// total. Verifying the same transaction twice is harmless.
    #[tracing::instrument(skip(self, params))]
    pub async fn confirm_payment(
        &self,
        method: PaymentMethod,
        params: &HashMap<String, String>,
    ) -> Result<ConfirmedPayment> {
        let result = self.verify_and_record(method, params).await;
        match &result {
            Ok(confirmed) => {
                metrics::counter!("payments_confirmed_total", "gateway" => method.as_str())
                    .increment(1);
                tracing::info!(
                    order_id = %confirmed.order.id,
                    transaction_id = confirmed.payment.transaction_id.as_deref(),
                    "payment confirmed"
                );
            }
            Err(err) => {
                metrics::counter!("payments_failed_total", "gateway" => method.as_str())
                    .increment(1);
                tracing::warn!(error = %err, "payment confirmation failed");
            }
        }
        result
    }

    async fn verify_and_record(
        &self,
        method: PaymentMethod,
        params: &HashMap<String, String>,
    ) -> Result<ConfirmedPayment> {
        let gateway = self.gateways.get(method)?;
        let callback = gateway.parse_callback(params)?;

        let known_order = match callback.order_id {
            Some(id) => Some(self.store.get_order(id).await?),
            None => None,
        };

        let started = std::time::Instant::now();
        let outcome = gateway
            .verify(VerifyRequest {
                reference: callback.reference,
                order_id: callback.order_id,
                expected_amount: known_order.as_ref().map(|order| order.total),
            })
            .await?;
        metrics::histogram!("payment_verification_seconds", "gateway" => method.as_str())
            .record(started.elapsed().as_secs_f64());

        let confirmation = match outcome {
            VerificationOutcome::Completed(confirmation) => confirmation,
            VerificationOutcome::NotCompleted { status } => {
                return Err(ServiceError::PaymentNotCompleted { status });
            }
        };

        let order = match known_order {
            Some(order) if order.id == confirmation.order_id => order,
            _ => self.store.get_order(confirmation.order_id).await?,
        };
        if order.payment_method != method {
            return Err(ServiceError::Invalid(format!(
                "Order #{} is not paid with {method}",
                order.tracking_number
            )));
        }
        if confirmation.amount != order.total {
            return Err(ServiceError::AmountMismatch {
                expected: order.total,
                paid: confirmation.amount,
            });
        }

        let payment = self
            .store
            .complete_payment(
                order.id,
                method,
                confirmation.transaction_id,
                confirmation.raw,
            )
            .await?;
        let order = self.store.get_order(order.id).await?;
        Ok(ConfirmedPayment { order, payment })
    }

    /// The customer's own order with its payments, for the success page.
    pub async fn payment_receipt(
        &self,
        customer_id: UserId,
        order_id: OrderId,
    ) -> Result<PaymentReceipt> {
        let order = self
            .store
            .get_customer_order(customer_id, order_id)
            .await?;
        let payments = self.store.payments_for_order(order.id).await?;
        Ok(PaymentReceipt { order, payments })
    }
}

fn failure_reason(err: &StoreError) -> &'static str {
    use domain::CheckoutError;

    match err {
        StoreError::Checkout(CheckoutError::InsufficientStock { .. }) => "insufficient_stock",
        StoreError::Checkout(CheckoutError::ProductNotFound { .. }) => "product_not_found",
        StoreError::Checkout(CheckoutError::ProductUnavailable { .. }) => "product_unavailable",
        StoreError::Checkout(_) | StoreError::Order(_) => "invalid_request",
        StoreError::NotFound { .. } => "not_found",
        _ => "internal",
    }
}
