//! Gateway settings loaded from environment variables.
//!
//! Every value falls back to the public sandbox credentials so a fresh
//! checkout can take test payments without any setup.

use std::time::Duration;

/// Sandbox merchant code for eSewa.
pub const ESEWA_SANDBOX_PRODUCT_CODE: &str = "EPAYTEST";
/// Sandbox signing secret for eSewa.
pub const ESEWA_SANDBOX_SECRET: &str = "8gBm/:&EnhH.1/q";
pub const ESEWA_SANDBOX_FORM_URL: &str = "https://rc-epay.esewa.com.np/api/epay/main/v2/form";
pub const ESEWA_SANDBOX_STATUS_URL: &str = "https://rc.esewa.com.np/api/epay/transaction/status/";

pub const KHALTI_SANDBOX_BASE_URL: &str = "https://a.khalti.com/api/v2";
pub const KHALTI_SANDBOX_SECRET: &str = "832cb66ed605485faa6559ba8791ee77";
pub const KHALTI_SANDBOX_PUBLIC_KEY: &str = "6cddd7dc34284795ba952f03c67ee2db";

/// Default timeout applied to every gateway request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// eSewa Epay v2 settings.
///
/// Reads `ESEWA_PRODUCT_CODE`, `ESEWA_SECRET_KEY`, `ESEWA_FORM_URL` and
/// `ESEWA_STATUS_URL`.
#[derive(Debug, Clone)]
pub struct EsewaConfig {
    pub product_code: String,
    pub secret_key: String,
    /// Where the customer's browser posts the signed form.
    pub form_url: String,
    /// Transaction status endpoint used for server-side verification.
    pub status_url: String,
}

impl EsewaConfig {
    pub fn from_env() -> Self {
        Self {
            product_code: env_or("ESEWA_PRODUCT_CODE", ESEWA_SANDBOX_PRODUCT_CODE),
            secret_key: env_or("ESEWA_SECRET_KEY", ESEWA_SANDBOX_SECRET),
            form_url: env_or("ESEWA_FORM_URL", ESEWA_SANDBOX_FORM_URL),
            status_url: env_or("ESEWA_STATUS_URL", ESEWA_SANDBOX_STATUS_URL),
        }
    }
}

impl Default for EsewaConfig {
    fn default() -> Self {
        Self {
            product_code: ESEWA_SANDBOX_PRODUCT_CODE.to_string(),
            secret_key: ESEWA_SANDBOX_SECRET.to_string(),
            form_url: ESEWA_SANDBOX_FORM_URL.to_string(),
            status_url: ESEWA_SANDBOX_STATUS_URL.to_string(),
        }
    }
}

/// Khalti ePayment v2 settings.
///
/// Reads `KHALTI_BASE_URL`, `KHALTI_SECRET_KEY`, `KHALTI_PUBLIC_KEY` and
/// `KHALTI_WEBSITE_URL`.
#[derive(Debug, Clone)]
pub struct KhaltiConfig {
    pub base_url: String,
    pub secret_key: String,
    pub public_key: String,
    /// Sent as `website_url` when initiating a payment.
    pub website_url: String,
}

impl KhaltiConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("KHALTI_BASE_URL", KHALTI_SANDBOX_BASE_URL),
            secret_key: env_or("KHALTI_SECRET_KEY", KHALTI_SANDBOX_SECRET),
            public_key: env_or("KHALTI_PUBLIC_KEY", KHALTI_SANDBOX_PUBLIC_KEY),
            website_url: env_or("KHALTI_WEBSITE_URL", "http://127.0.0.1:3000/"),
        }
    }
}

impl Default for KhaltiConfig {
    fn default() -> Self {
        Self {
            base_url: KHALTI_SANDBOX_BASE_URL.to_string(),
            secret_key: KHALTI_SANDBOX_SECRET.to_string(),
            public_key: KHALTI_SANDBOX_PUBLIC_KEY.to_string(),
            website_url: "http://127.0.0.1:3000/".to_string(),
        }
    }
}

/// Settings for both gateways plus the shared request timeout
/// (`GATEWAY_TIMEOUT_SECS`).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub esewa: EsewaConfig,
    pub khalti: KhaltiConfig,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            esewa: EsewaConfig::from_env(),
            khalti: KhaltiConfig::from_env(),
            timeout: std::env::var("GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            esewa: EsewaConfig::default(),
            khalti: KhaltiConfig::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_sandbox() {
        let config = GatewayConfig::default();
        assert_eq!(config.esewa.product_code, "EPAYTEST");
        assert!(config.esewa.status_url.starts_with("https://rc.esewa.com.np"));
        assert_eq!(config.khalti.base_url, "https://a.khalti.com/api/v2");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
