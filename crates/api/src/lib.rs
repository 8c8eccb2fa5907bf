//! HTTP API for the FurniQ storefront and its back office.
//!
//! Public storefront, customer account, staff and admin endpoints over a
//! single [`Store`], with structured logging (tracing) and Prometheus
//! metrics. Callers authenticate with `Authorization: Bearer <token>` from
//! `POST /auth/login`.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

use routes::{accounts, catalog, customers, orders, payments, shipments};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .merge(storefront_routes())
        .merge(account_routes())
        .merge(staff_routes())
        .merge(admin_routes())
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Pages anyone can reach, plus checkout and the gateway redirects.
fn storefront_routes<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/home", get(catalog::home::<S>))
        .route("/site-content", get(catalog::site_content::<S>))
        .route("/products", get(catalog::list::<S>))
        .route("/products/{id}", get(catalog::get::<S>))
        .route("/categories/{category}", get(catalog::category::<S>))
        .route("/search", get(catalog::search::<S>))
        .route("/checkout", post(orders::checkout::<S>))
        .route("/orders/track", post(orders::track::<S>))
        .route("/shipments/track/{number}", get(shipments::track::<S>))
        .route("/payments/esewa/callback", get(payments::esewa_callback::<S>))
        .route("/payments/khalti/verify", get(payments::khalti_verify::<S>))
        .route("/payments/success", get(payments::success::<S>))
}

fn account_routes<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/auth/register", post(accounts::register::<S>))
        .route("/auth/login", post(accounts::login::<S>))
        .route("/auth/logout", post(accounts::logout::<S>))
        .route(
            "/account/profile",
            get(accounts::profile::<S>).put(accounts::update_profile::<S>),
        )
        .route("/account/password", post(accounts::change_password::<S>))
        .route("/account/orders", get(orders::my_orders::<S>))
        .route("/account/orders/{id}", get(orders::my_order::<S>))
        .route(
            "/account/addresses",
            get(customers::addresses::<S>).post(customers::add_address::<S>),
        )
        .route(
            "/account/addresses/{id}",
            put(customers::update_address::<S>).delete(customers::delete_address::<S>),
        )
        .route(
            "/account/saved-items",
            get(customers::saved_items::<S>).post(customers::save_item::<S>),
        )
        .route(
            "/account/saved-items/{product_id}",
            delete(customers::remove_item::<S>),
        )
        .route("/notifications", get(customers::notifications::<S>))
        .route("/notifications/read-all", post(customers::mark_all_read::<S>))
        .route("/notifications/{id}/read", post(customers::mark_read::<S>))
}

fn staff_routes<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/staff/orders", get(orders::queue::<S>))
        .route("/staff/orders/{id}", get(orders::detail::<S>))
        .route("/staff/orders/{id}/status", post(orders::change_status::<S>))
        .route("/staff/activity", get(orders::activity::<S>))
        .route("/staff/products/{id}/stock", post(catalog::adjust_stock::<S>))
}

fn admin_routes<S: Store>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route(
            "/admin/products",
            get(catalog::admin_list::<S>).post(catalog::create::<S>),
        )
        .route(
            "/admin/products/{id}",
            put(catalog::update::<S>).delete(catalog::delete::<S>),
        )
        .route("/admin/products/{id}/toggle", post(catalog::toggle_active::<S>))
        .route("/admin/site-content", put(catalog::update_site_content::<S>))
        .route("/admin/orders/{id}", put(orders::admin_update::<S>))
        .route("/admin/orders/{id}/shipment", post(shipments::assign::<S>))
        .route("/admin/shipments/{id}/events", post(shipments::add_event::<S>))
        .route("/admin/history", get(orders::history::<S>))
        .route("/admin/payments", get(orders::payments::<S>))
        .route("/admin/profiles", get(accounts::profiles::<S>))
        .route("/admin/profiles/{id}/approve", post(accounts::approve::<S>))
        .route("/admin/profiles/{id}/reject", post(accounts::reject::<S>))
        .route(
            "/admin/users",
            get(accounts::users::<S>).post(accounts::create_user::<S>),
        )
        .route(
            "/admin/users/{id}",
            put(accounts::update_user::<S>).delete(accounts::delete_user::<S>),
        )
        .route("/admin/users/{id}/toggle-staff", post(accounts::toggle_staff::<S>))
}
