//! Khalti ePayment v2 integration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::OrderId;
use domain::{Money, PaymentMethod};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::KhaltiConfig;
use crate::error::{GatewayError, Result};
use crate::gateway::{
    CustomerInfo, PaymentCallback, PaymentConfirmation, PaymentGateway, PaymentInitiation,
    PaymentRequest, VerificationOutcome, VerifyRequest,
};

/// Lookup status of a settled payment.
pub const STATUS_COMPLETED: &str = "Completed";

#[derive(Debug, Serialize)]
struct InitiateBody<'a> {
    return_url: &'a str,
    website_url: &'a str,
    /// Paisa.
    amount: i64,
    purchase_order_id: String,
    purchase_order_name: String,
    customer_info: &'a CustomerInfo,
}

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    pidx: String,
    payment_url: String,
}

#[derive(Debug, Serialize)]
struct LookupBody<'a> {
    pidx: &'a str,
}

/// Khalti client.
#[derive(Debug, Clone)]
pub struct KhaltiGateway {
    config: KhaltiConfig,
    client: Client,
}

impl KhaltiGateway {
    pub fn new(config: KhaltiConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::with_capacity(1);
        let key = HeaderValue::from_str(&format!("Key {}", config.secret_key))
            .map_err(|e| GatewayError::Request(format!("invalid Khalti secret key: {e}")))?;
        headers.insert(AUTHORIZATION, key);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "sending Khalti request");
        let started = Instant::now();
        let response = self
            .client
            .request(Method::POST, url)
            .json(body)
            .send()
            .await;
        metrics::histogram!("payment_gateway_request_seconds", "gateway" => "khalti")
            .record(started.elapsed().as_secs_f64());
        let response = response?;

        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            tracing::warn!(status, %message, path, "Khalti rejected the request");
            Err(GatewayError::Rejected { status, message })
        }
    }
}

fn parse_order_id(value: &str) -> Option<OrderId> {
    value.trim().parse().ok()
}

#[async_trait]
impl PaymentGateway for KhaltiGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Khalti
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentInitiation> {
        let body = InitiateBody {
            return_url: &request.return_url,
            website_url: &self.config.website_url,
            amount: request.amount.paisa(),
            purchase_order_id: request.order_id.to_string(),
            purchase_order_name: format!("FurniQ Order #{}", request.tracking_number),
            customer_info: &request.customer,
        };
        let response: InitiateResponse = self.post("/epayment/initiate/", &body).await?;
        tracing::info!(pidx = %response.pidx, "Khalti payment initiated");
        Ok(PaymentInitiation::Redirect {
            payment_url: response.payment_url,
            pidx: response.pidx,
        })
    }

    fn parse_callback(&self, params: &HashMap<String, String>) -> Result<PaymentCallback> {
        let pidx = params
            .get("pidx")
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .ok_or_else(|| GatewayError::InvalidReference("missing pidx".into()))?;
        if let Some(status) = params.get("status")
            && status != STATUS_COMPLETED
        {
            return Err(GatewayError::Declined(format!("Payment status: {status}")));
        }
        Ok(PaymentCallback {
            reference: pidx,
            order_id: params
                .get("purchase_order_id")
                .and_then(|id| parse_order_id(id)),
        })
    }

    #[tracing::instrument(skip(self, request), fields(pidx = %request.reference))]
    async fn verify(&self, request: VerifyRequest) -> Result<VerificationOutcome> {
        let raw: Value = self
            .post(
                "/epayment/lookup/",
                &LookupBody {
                    pidx: &request.reference,
                },
            )
            .await?;

        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();
        if status != STATUS_COMPLETED {
            tracing::info!(%status, "Khalti payment not completed");
            return Ok(VerificationOutcome::NotCompleted { status });
        }

        let order_id = raw
            .get("purchase_order_id")
            .and_then(Value::as_str)
            .and_then(parse_order_id)
            .or(request.order_id)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("Order ID not found in response".to_string())
            })?;
        let amount = raw
            .get("total_amount")
            .and_then(Value::as_i64)
            .map(Money::from_paisa)
            .ok_or_else(|| GatewayError::InvalidResponse("lookup has no total_amount".into()))?;
        let transaction_id = raw
            .get("transaction_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(request.reference.as_str())
            .to_string();

        tracing::info!(%order_id, %transaction_id, "Khalti payment completed");
        Ok(VerificationOutcome::Completed(PaymentConfirmation {
            order_id,
            transaction_id,
            amount,
            raw,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> KhaltiGateway {
        KhaltiGateway::new(KhaltiConfig::default(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let mut config = KhaltiConfig::default();
        config.base_url = "http://localhost:9000/api/v2/".into();
        let gateway = KhaltiGateway::new(config, Duration::from_secs(1)).unwrap();
        assert_eq!(
            gateway.url("/epayment/lookup/"),
            "http://localhost:9000/api/v2/epayment/lookup/"
        );
    }

    #[test]
    fn test_parse_callback_reads_pidx_and_order() {
        let order_id = OrderId::new();
        let params = HashMap::from([
            ("pidx".to_string(), "bZQLD9wRVWo4CdESSfuSsB".to_string()),
            ("status".to_string(), "Completed".to_string()),
            ("purchase_order_id".to_string(), order_id.to_string()),
        ]);
        let callback = gateway().parse_callback(&params).unwrap();
        assert_eq!(callback.reference, "bZQLD9wRVWo4CdESSfuSsB");
        assert_eq!(callback.order_id, Some(order_id));
    }

    #[test]
    fn test_parse_callback_rejects_cancelled_and_missing_pidx() {
        let cancelled = HashMap::from([
            ("pidx".to_string(), "abc".to_string()),
            ("status".to_string(), "User canceled".to_string()),
        ]);
        assert!(matches!(
            gateway().parse_callback(&cancelled),
            Err(GatewayError::Declined(msg)) if msg == "Payment status: User canceled"
        ));
        assert!(matches!(
            gateway().parse_callback(&HashMap::new()),
            Err(GatewayError::InvalidReference(_))
        ));
    }
}
