//! API server entry point.

use std::sync::Arc;

use api::{AppState, Config};
use metrics_exporter_prometheus::PrometheusHandle;
use payments::GatewayRegistry;
use services::AccountService;
use store::{InMemoryStore, PostgresStore, Store};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Payment gateways
    let gateways = GatewayRegistry::from_config(&config.gateways)?;

    // 4. Pick the store and serve
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresStore::connect(&url, config.database_max_connections).await?;
            store.run_migrations().await?;
            tracing::info!("connected to PostgreSQL");
            serve(store, gateways, config, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            serve(InMemoryStore::new(), gateways, config, metrics_handle).await
        }
    }
}

async fn serve<S: Store>(
    store: S,
    gateways: GatewayRegistry,
    config: Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError> {
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let accounts = AccountService::new(store.clone(), config.session_ttl());
        let admin = accounts.ensure_admin(email, password).await?;
        tracing::info!(admin_id = %admin.id, "bootstrap admin ready");
    }

    let state = Arc::new(AppState::new(store, gateways, &config));
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}
