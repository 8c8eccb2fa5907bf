//! The gateway abstraction shared by eSewa, Khalti and the in-memory fake.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{Money, PaymentMethod};
use serde::Serialize;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::esewa::EsewaGateway;
use crate::khalti::KhaltiGateway;

/// Customer details some gateways display on their payment page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Everything a gateway needs to start collecting payment for an order.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub tracking_number: String,
    pub amount: Money,
    pub customer: CustomerInfo,
    /// Where the gateway sends the customer after paying.
    pub return_url: String,
    /// Where the gateway sends the customer after a failed payment.
    pub failure_url: String,
}

/// What the storefront hands back to the browser to continue payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentInitiation {
    /// A form the browser must POST to `action_url`.
    Form {
        action_url: String,
        fields: BTreeMap<String, String>,
    },
    /// A hosted payment page to redirect to.
    Redirect { payment_url: String, pidx: String },
}

/// A reference extracted from the gateway's return redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCallback {
    /// eSewa `transaction_uuid` or Khalti `pidx`.
    pub reference: String,
    /// Order the reference belongs to, when the callback reveals it.
    pub order_id: Option<OrderId>,
}

/// Server-side verification of a payment reference.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyRequest {
    pub reference: String,
    /// Order taken from the callback, used when the gateway does not echo it.
    pub order_id: Option<OrderId>,
    /// The amount the storefront expects, required by eSewa's status API.
    pub expected_amount: Option<Money>,
}

/// A payment the gateway confirmed as settled.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub order_id: OrderId,
    /// Gateway transaction reference stored on the payment record.
    pub transaction_id: String,
    pub amount: Money,
    /// Raw verification payload.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Completed(PaymentConfirmation),
    NotCompleted { status: String },
}

/// An online payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The payment method this gateway settles.
    fn method(&self) -> PaymentMethod;

    /// Starts a payment and returns the browser instruction.
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentInitiation>;

    /// Reads the query parameters of the gateway's return redirect.
    fn parse_callback(&self, params: &HashMap<String, String>) -> Result<PaymentCallback>;

    /// Asks the gateway whether a payment actually settled.
    async fn verify(&self, request: VerifyRequest) -> Result<VerificationOutcome>;
}

/// Gateways by payment method. Cash on delivery has none.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the eSewa and Khalti HTTP clients.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let esewa = EsewaGateway::new(config.esewa.clone(), config.timeout)?;
        let khalti = KhaltiGateway::new(config.khalti.clone(), config.timeout)?;
        Ok(Self::new().with_gateway(esewa).with_gateway(khalti))
    }

    /// Registers a gateway under its own method, replacing any previous one.
    pub fn with_gateway(mut self, gateway: impl PaymentGateway + 'static) -> Self {
        self.gateways.insert(gateway.method(), Arc::new(gateway));
        self
    }

    pub fn get(&self, method: PaymentMethod) -> Result<Arc<dyn PaymentGateway>> {
        self.gateways
            .get(&method)
            .cloned()
            .ok_or(GatewayError::Unsupported(method))
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let methods: Vec<_> = self.gateways.keys().map(PaymentMethod::as_str).collect();
        f.debug_struct("GatewayRegistry")
            .field("methods", &methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGateway;

    #[test]
    fn test_registry_resolves_by_method() {
        let registry = GatewayRegistry::new()
            .with_gateway(InMemoryGateway::new(PaymentMethod::Esewa))
            .with_gateway(InMemoryGateway::new(PaymentMethod::Khalti));

        assert_eq!(
            registry.get(PaymentMethod::Khalti).unwrap().method(),
            PaymentMethod::Khalti
        );
        assert!(matches!(
            registry.get(PaymentMethod::Cod),
            Err(GatewayError::Unsupported(PaymentMethod::Cod))
        ));
    }

    #[test]
    fn test_sandbox_registry_has_both_gateways() {
        let registry = GatewayRegistry::from_config(&GatewayConfig::default()).unwrap();
        assert!(registry.get(PaymentMethod::Esewa).is_ok());
        assert!(registry.get(PaymentMethod::Khalti).is_ok());
    }

    #[test]
    fn test_initiation_serializes_with_type_tag() {
        let redirect = PaymentInitiation::Redirect {
            payment_url: "https://pay.khalti.com/?pidx=abc".into(),
            pidx: "abc".into(),
        };
        let json = serde_json::to_value(&redirect).unwrap();
        assert_eq!(json["type"], "redirect");
        assert_eq!(json["pidx"], "abc");
    }
}
