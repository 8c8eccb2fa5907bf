//! Application configuration loaded from environment variables.

use payments::GatewayConfig;
use services::accounts::DEFAULT_SESSION_TTL_HOURS;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `"json"` for JSON log lines, anything else for text
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `PUBLIC_BASE_URL`: where gateways send customers back (default: `"http://127.0.0.1:3000"`)
/// - `SESSION_TTL_HOURS`: sign-in session lifetime (default: two weeks)
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD`: bootstrap admin, created when both are set
///
/// Gateway keys and URLs come from [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub public_base_url: String,
    pub session_ttl_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub gateways: GatewayConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parsed_var("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")),
            database_url: non_empty_var("DATABASE_URL"),
            database_max_connections: parsed_var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            public_base_url: non_empty_var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            session_ttl_hours: parsed_var("SESSION_TTL_HOURS")
                .filter(|hours| *hours > 0)
                .unwrap_or(defaults.session_ttl_hours),
            admin_email: non_empty_var("ADMIN_EMAIL"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
            gateways: GatewayConfig::from_env(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            json_logs: false,
            database_url: None,
            database_max_connections: 10,
            public_base_url: "http://127.0.0.1:3000".to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            admin_email: None,
            admin_password: None,
            gateways: GatewayConfig::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
