//! eSewa Epay v2 integration.
//!
//! eSewa payments start with a signed HTML form the customer's browser posts
//! to eSewa. The signature is `base64(HMAC-SHA256(secret, message))` where
//! the message lists the signed fields as `name=value` pairs joined by
//! commas, in the order given by `signed_field_names`. After payment eSewa
//! redirects back with a base64 JSON `data` parameter signed the same way,
//! and the transaction is confirmed with the status API.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use common::OrderId;
use domain::{Money, PaymentMethod};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{Map, Value};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::EsewaConfig;
use crate::error::{GatewayError, Result};
use crate::gateway::{
    PaymentCallback, PaymentConfirmation, PaymentGateway, PaymentInitiation, PaymentRequest,
    VerificationOutcome, VerifyRequest,
};

type HmacSha256 = Hmac<Sha256>;

/// Fields covered by the signature of an outgoing payment form.
pub const SIGNED_FIELD_NAMES: &str = "total_amount,transaction_uuid,product_code";

/// Status reported by eSewa for a settled transaction.
pub const STATUS_COMPLETE: &str = "COMPLETE";

fn new_mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::InvalidResponse(format!("invalid eSewa secret: {e}")))
}

/// Signs an arbitrary eSewa message.
pub fn sign_message(secret: &str, message: &str) -> Result<String> {
    let mut mac = new_mac(secret)?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Signature of an outgoing payment form.
pub fn signature(
    secret: &str,
    total_amount: &str,
    transaction_uuid: &str,
    product_code: &str,
) -> Result<String> {
    sign_message(
        secret,
        &format!(
            "total_amount={total_amount},transaction_uuid={transaction_uuid},product_code={product_code}"
        ),
    )
}

/// A fresh transaction uuid for an order: `{order id as simple hex}-{8 hex}`.
///
/// Every attempt gets a new suffix because eSewa refuses to reuse a uuid.
pub fn new_transaction_uuid(order_id: OrderId) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", order_id.as_uuid().simple(), &suffix[..8])
}

/// Recovers the order id from a transaction uuid.
pub fn order_id_from_transaction_uuid(transaction_uuid: &str) -> Result<OrderId> {
    let (order_part, _) = transaction_uuid
        .split_once('-')
        .ok_or_else(|| GatewayError::InvalidReference(transaction_uuid.to_string()))?;
    Uuid::parse_str(order_part)
        .map(OrderId::from_uuid)
        .map_err(|_| GatewayError::InvalidReference(transaction_uuid.to_string()))
}

/// Formats an amount the way eSewa expects it in forms and status queries:
/// whole rupees when there are no paisa, two decimals otherwise.
pub fn format_amount(amount: Money) -> String {
    if amount.paisa_part() == 0 {
        amount.rupees().to_string()
    } else {
        format!("{}.{:02}", amount.rupees(), amount.paisa_part())
    }
}

/// Parses an eSewa amount such as `"1,000.0"`, `"1500"` or `100.5`.
///
/// Negative or out-of-range amounts are rejected.
pub fn parse_amount(value: &Value) -> Option<Money> {
    let text = match value {
        Value::String(s) => s.replace(',', ""),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let (whole, fraction) = match text.trim().split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), fraction.to_string()),
        None => (text.trim().to_string(), String::new()),
    };
    let rupees: u64 = whole.parse().ok()?;
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits: String = fraction.chars().take(2).collect();
    while digits.len() < 2 {
        digits.push('0');
    }
    let paisa: u64 = digits.parse().ok()?;
    let total = rupees.checked_mul(100)?.checked_add(paisa)?;
    Some(Money::from_paisa(i64::try_from(total).ok()?))
}

/// The decoded `data` parameter of eSewa's return redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct EsewaCallback {
    pub transaction_code: Option<String>,
    pub status: String,
    pub total_amount: Option<Money>,
    pub transaction_uuid: String,
    pub product_code: String,
    pub raw: Value,
}

fn field_text(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Decodes the base64 JSON `data` parameter and checks its signature over
/// the fields it names in `signed_field_names`.
pub fn decode_callback(secret: &str, data: &str) -> Result<EsewaCallback> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| GatewayError::InvalidResponse(format!("callback data is not base64: {e}")))?;
    let raw: Value = serde_json::from_slice(&bytes)
        .map_err(|e| GatewayError::InvalidResponse(format!("callback data is not JSON: {e}")))?;
    let fields = raw
        .as_object()
        .ok_or_else(|| GatewayError::InvalidResponse("callback data is not an object".into()))?;

    let signed_field_names = field_text(fields, "signed_field_names")
        .ok_or_else(|| GatewayError::InvalidResponse("missing signed_field_names".into()))?;
    let signature = field_text(fields, "signature").ok_or(GatewayError::InvalidSignature)?;

    let message = signed_field_names
        .split(',')
        .map(|name| {
            let name = name.trim();
            format!("{name}={}", field_text(fields, name).unwrap_or_default())
        })
        .collect::<Vec<_>>()
        .join(",");

    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| GatewayError::InvalidSignature)?;
    let mut mac = new_mac(secret)?;
    mac.update(message.as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| GatewayError::InvalidSignature)?;

    let require = |name: &str| {
        field_text(fields, name)
            .ok_or_else(|| GatewayError::InvalidResponse(format!("callback data has no {name}")))
    };
    Ok(EsewaCallback {
        transaction_code: field_text(fields, "transaction_code"),
        status: require("status")?,
        total_amount: fields.get("total_amount").and_then(parse_amount),
        transaction_uuid: require("transaction_uuid")?,
        product_code: require("product_code")?,
        raw: raw.clone(),
    })
}

/// eSewa client.
#[derive(Debug, Clone)]
pub struct EsewaGateway {
    config: EsewaConfig,
    client: Client,
}

impl EsewaGateway {
    pub fn new(config: EsewaConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &EsewaConfig {
        &self.config
    }

    /// Builds the signed form fields for a payment attempt.
    pub fn form_fields(&self, request: &PaymentRequest) -> Result<BTreeMap<String, String>> {
        let transaction_uuid = new_transaction_uuid(request.order_id);
        let total_amount = format_amount(request.amount);
        let signature = signature(
            &self.config.secret_key,
            &total_amount,
            &transaction_uuid,
            &self.config.product_code,
        )?;

        let fields = [
            ("amount", total_amount.clone()),
            ("tax_amount", "0".to_string()),
            ("total_amount", total_amount),
            ("transaction_uuid", transaction_uuid),
            ("product_code", self.config.product_code.clone()),
            ("product_service_charge", "0".to_string()),
            ("product_delivery_charge", "0".to_string()),
            ("success_url", request.return_url.clone()),
            ("failure_url", request.failure_url.clone()),
            ("signed_field_names", SIGNED_FIELD_NAMES.to_string()),
            ("signature", signature),
        ];
        Ok(fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect())
    }
}

#[async_trait]
impl PaymentGateway for EsewaGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Esewa
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentInitiation> {
        let fields = self.form_fields(&request)?;
        tracing::info!(
            transaction_uuid = fields.get("transaction_uuid").map(String::as_str),
            total_amount = fields.get("total_amount").map(String::as_str),
            "eSewa payment form signed"
        );
        Ok(PaymentInitiation::Form {
            action_url: self.config.form_url.clone(),
            fields,
        })
    }

    fn parse_callback(&self, params: &HashMap<String, String>) -> Result<PaymentCallback> {
        if params.get("status").is_some_and(|s| s == "failed") {
            return Err(GatewayError::Declined(
                "eSewa payment failed or cancelled".to_string(),
            ));
        }

        let reference = match params.get("data") {
            Some(data) => {
                let callback = decode_callback(&self.config.secret_key, data)?;
                if callback.status != STATUS_COMPLETE {
                    return Err(GatewayError::Declined(format!(
                        "eSewa reported status {}",
                        callback.status
                    )));
                }
                callback.transaction_uuid
            }
            None => params
                .get("transaction_uuid")
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .ok_or_else(|| GatewayError::InvalidReference("missing transaction_uuid".into()))?,
        };

        let order_id = order_id_from_transaction_uuid(&reference)?;
        Ok(PaymentCallback {
            reference,
            order_id: Some(order_id),
        })
    }

    #[tracing::instrument(skip(self, request), fields(transaction_uuid = %request.reference))]
    async fn verify(&self, request: VerifyRequest) -> Result<VerificationOutcome> {
        let order_id = order_id_from_transaction_uuid(&request.reference)?;
        let expected = request.expected_amount.ok_or_else(|| {
            GatewayError::InvalidReference("eSewa verification needs the order total".into())
        })?;
        let total_amount = format_amount(expected);

        let started = Instant::now();
        let response = self
            .client
            .get(&self.config.status_url)
            .query(&[
                ("product_code", self.config.product_code.as_str()),
                ("total_amount", total_amount.as_str()),
                ("transaction_uuid", request.reference.as_str()),
            ])
            .send()
            .await;
        metrics::histogram!("payment_gateway_request_seconds", "gateway" => "esewa")
            .record(started.elapsed().as_secs_f64());
        let response = response?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await?;
            tracing::warn!(status, %message, "eSewa status check rejected");
            return Err(GatewayError::Rejected { status, message });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();

        if status != STATUS_COMPLETE {
            tracing::info!(%status, "eSewa payment not complete");
            return Ok(VerificationOutcome::NotCompleted { status });
        }

        let transaction_id = raw
            .get("ref_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(request.reference.as_str())
            .to_string();
        let amount = match raw.get("total_amount") {
            Some(value) => parse_amount(value).ok_or_else(|| {
                GatewayError::InvalidResponse(format!("unreadable total_amount {value}"))
            })?,
            None => expected,
        };

        tracing::info!(%transaction_id, "eSewa payment complete");
        Ok(VerificationOutcome::Completed(PaymentConfirmation {
            order_id,
            transaction_id,
            amount,
            raw,
        }))
    }
}
