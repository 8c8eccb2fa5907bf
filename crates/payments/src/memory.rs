//! In-memory payment gateway for tests and local development.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::{Money, PaymentMethod};

use crate::error::{GatewayError, Result};
use crate::esewa;
use crate::gateway::{
    PaymentCallback, PaymentConfirmation, PaymentGateway, PaymentInitiation, PaymentRequest,
    VerificationOutcome, VerifyRequest,
};

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    /// Reference -> (order, amount) for every initiated payment.
    payments: HashMap<String, (OrderId, Money)>,
    next_id: u32,
    fail_on_initiate: bool,
    fail_on_verify: bool,
    reported_status: Option<String>,
    reported_amount: Option<Money>,
}

/// A gateway that settles every initiated payment unless told otherwise.
///
/// eSewa-flavoured instances hand out real transaction uuids so callbacks
/// carry the order id exactly like the live gateway.
#[derive(Debug, Clone)]
pub struct InMemoryGateway {
    method: PaymentMethod,
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            state: Arc::default(),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut InMemoryGatewayState) -> T) -> T {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Configures the gateway to fail the next initiations.
    pub fn set_fail_on_initiate(&self, fail: bool) {
        self.with_state(|s| s.fail_on_initiate = fail);
    }

    /// Configures the gateway to fail verification requests.
    pub fn set_fail_on_verify(&self, fail: bool) {
        self.with_state(|s| s.fail_on_verify = fail);
    }

    /// Reports this status instead of settling payments.
    pub fn set_reported_status(&self, status: Option<&str>) {
        self.with_state(|s| s.reported_status = status.map(str::to_string));
    }

    /// Reports this amount instead of the initiated one.
    pub fn set_reported_amount(&self, amount: Option<Money>) {
        self.with_state(|s| s.reported_amount = amount);
    }

    /// Number of payments initiated so far.
    pub fn initiated_count(&self) -> usize {
        self.with_state(|s| s.payments.len())
    }

    /// The reference handed out for an order, if any.
    pub fn reference_for(&self, order_id: OrderId) -> Option<String> {
        self.with_state(|s| {
            s.payments
                .iter()
                .find(|(_, (id, _))| *id == order_id)
                .map(|(reference, _)| reference.clone())
        })
    }

    fn reference_key(&self) -> &'static str {
        match self.method {
            PaymentMethod::Esewa => "transaction_uuid",
            _ => "pidx",
        }
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentInitiation> {
        let method = self.method;
        self.with_state(|state| {
            if state.fail_on_initiate {
                return Err(GatewayError::Rejected {
                    status: 503,
                    message: format!("{method} is unavailable"),
                });
            }

            state.next_id += 1;
            let initiation = match method {
                PaymentMethod::Esewa => {
                    let transaction_uuid = esewa::new_transaction_uuid(request.order_id);
                    state
                        .payments
                        .insert(transaction_uuid.clone(), (request.order_id, request.amount));
                    PaymentInitiation::Form {
                        action_url: "memory://esewa/form".to_string(),
                        fields: BTreeMap::from([
                            ("transaction_uuid".to_string(), transaction_uuid),
                            (
                                "total_amount".to_string(),
                                esewa::format_amount(request.amount),
                            ),
                        ]),
                    }
                }
                _ => {
                    let pidx = format!("PIDX-{:04}", state.next_id);
                    state
                        .payments
                        .insert(pidx.clone(), (request.order_id, request.amount));
                    PaymentInitiation::Redirect {
                        payment_url: format!("memory://khalti/pay?pidx={pidx}"),
                        pidx,
                    }
                }
            };
            Ok(initiation)
        })
    }

    fn parse_callback(&self, params: &HashMap<String, String>) -> Result<PaymentCallback> {
        if params.get("status").is_some_and(|s| s == "failed") {
            return Err(GatewayError::Declined(format!("{} payment failed", self.method)));
        }
        let key = self.reference_key();
        let reference = params
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::InvalidReference(format!("missing {key}")))?;
        let order_id = self.with_state(|s| s.payments.get(&reference).map(|(id, _)| *id));
        Ok(PaymentCallback {
            reference,
            order_id,
        })
    }

    async fn verify(&self, request: VerifyRequest) -> Result<VerificationOutcome> {
        self.with_state(|state| {
            if state.fail_on_verify {
                return Err(GatewayError::Request("connection reset".to_string()));
            }
            if let Some(status) = &state.reported_status {
                return Ok(VerificationOutcome::NotCompleted {
                    status: status.clone(),
                });
            }
            let (order_id, amount) = state
                .payments
                .get(&request.reference)
                .copied()
                .ok_or_else(|| GatewayError::InvalidReference(request.reference.clone()))?;
            Ok(VerificationOutcome::Completed(PaymentConfirmation {
                order_id,
                transaction_id: format!("TXN-{}", request.reference),
                amount: state.reported_amount.unwrap_or(amount),
                raw: serde_json::json!({
                    "reference": request.reference,
                    "status": "Completed",
                    "total_amount": amount.paisa(),
                }),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CustomerInfo;

    fn request(amount: Money) -> PaymentRequest {
        PaymentRequest {
            order_id: OrderId::new(),
            tracking_number: "FNQ-0000000001".into(),
            amount,
            customer: CustomerInfo {
                name: "Ram".into(),
                email: "ram@example.com".into(),
                phone: "9811111111".into(),
            },
            return_url: "memory://return".into(),
            failure_url: "memory://failure".into(),
        }
    }

    #[tokio::test]
    async fn test_initiate_then_verify() {
        let gateway = InMemoryGateway::new(PaymentMethod::Khalti);
        let request = request(Money::from_rupees(4_500));
        let order_id = request.order_id;

        let PaymentInitiation::Redirect { pidx, .. } = gateway.initiate(request).await.unwrap()
        else {
            panic!("expected redirect");
        };
        assert_eq!(gateway.initiated_count(), 1);

        let params = HashMap::from([("pidx".to_string(), pidx.clone())]);
        let callback = gateway.parse_callback(&params).unwrap();
        assert_eq!(callback.order_id, Some(order_id));

        let outcome = gateway
            .verify(VerifyRequest {
                reference: pidx,
                order_id: callback.order_id,
                expected_amount: None,
            })
            .await
            .unwrap();
        let VerificationOutcome::Completed(confirmation) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(confirmation.order_id, order_id);
        assert_eq!(confirmation.amount, Money::from_rupees(4_500));
    }

    #[tokio::test]
    async fn test_esewa_flavour_issues_transaction_uuids() {
        let gateway = InMemoryGateway::new(PaymentMethod::Esewa);
        let request = request(Money::from_rupees(1_200));
        let order_id = request.order_id;

        gateway.initiate(request).await.unwrap();
        let reference = gateway.reference_for(order_id).unwrap();
        assert_eq!(
            esewa::order_id_from_transaction_uuid(&reference).unwrap(),
            order_id
        );
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let gateway = InMemoryGateway::new(PaymentMethod::Khalti);
        gateway.set_fail_on_initiate(true);
        assert!(matches!(
            gateway.initiate(request(Money::from_rupees(10))).await,
            Err(GatewayError::Rejected { status: 503, .. })
        ));

        gateway.set_fail_on_initiate(false);
        gateway.initiate(request(Money::from_rupees(10))).await.unwrap();
        gateway.set_reported_status(Some("User canceled"));
        let outcome = gateway
            .verify(VerifyRequest {
                reference: "PIDX-0001".into(),
                order_id: None,
                expected_amount: None,
            })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            VerificationOutcome::NotCompleted {
                status: "User canceled".into()
            }
        );

        gateway.set_fail_on_verify(true);
        assert!(gateway
            .verify(VerifyRequest {
                reference: "PIDX-0001".into(),
                order_id: None,
                expected_amount: None,
            })
            .await
            .is_err());
    }
}
