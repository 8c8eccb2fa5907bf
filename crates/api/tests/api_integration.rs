//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::{AppState, Config};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::PaymentMethod;
use metrics_exporter_prometheus::PrometheusHandle;
use payments::{GatewayRegistry, InMemoryGateway};
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const ADMIN_EMAIL: &str = "admin@furniq.test";
const ADMIN_PASSWORD: &str = "admin-pass-123";

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    khalti: InMemoryGateway,
}

impl TestApp {
    async fn new() -> Self {
        let khalti = InMemoryGateway::new(PaymentMethod::Khalti);
        let gateways = GatewayRegistry::new()
            .with_gateway(InMemoryGateway::new(PaymentMethod::Esewa))
            .with_gateway(khalti.clone());
        let state = Arc::new(AppState::new(
            InMemoryStore::new(),
            gateways,
            &Config::default(),
        ));
        state
            .accounts
            .ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();
        let app = api::create_app(state, get_metrics_handle());
        Self { app, khalti }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, json) = self
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {json}");
        json["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Registers a customer and returns their session token.
    async fn customer(&self, email: &str, phone: &str) -> String {
        let (status, _) = self
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({
                    "full_name": "Test Customer",
                    "email": email,
                    "password": "password123",
                    "phone": phone,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(email, "password123").await
    }

    /// Creates a product as admin and returns its id.
    async fn product(&self, admin: &str, name: &str, rupees: i64, stock: u32) -> String {
        let (status, json) = self
            .send(
                "POST",
                "/admin/products",
                Some(admin),
                Some(json!({
                    "name": name,
                    "price_paisa": rupees * 100,
                    "stock": stock,
                    "category": "Living Room",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "product failed: {json}");
        json["id"].as_str().unwrap().to_string()
    }

    async fn checkout(
        &self,
        token: &str,
        product_id: &str,
        quantity: u32,
        method: &str,
    ) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/checkout",
            Some(token),
            Some(json!({
                "items": [{ "product_id": product_id, "quantity": quantity }],
                "payment_method": method,
                "address": "Lazimpat, Kathmandu",
                "phone": "9800000001",
            })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new().await;

    let (status, json) = t.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "furniq");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new().await;
    let _ = t.send("GET", "/health", None, None).await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let t = TestApp::new().await;
    let token = t.customer("hari@example.com", "9800000001").await;

    let (status, json) = t.send("GET", "/account/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["email"], "hari@example.com");
    assert_eq!(json["role"], "customer");
    assert!(json.get("password_hash").is_none());

    let (status, json) = t
        .send(
            "PUT",
            "/account/profile",
            Some(&token),
            Some(json!({ "full_name": "Hari Bahadur", "phone_number": "9811111111" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["full_name"], "Hari Bahadur");
    assert_eq!(json["phone_number"], "9811111111");

    let (status, _) = t.send("POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = t.send("GET", "/account/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let t = TestApp::new().await;
    t.customer("hari@example.com", "9800000001").await;

    let (status, json) = t
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "hari@example.com", "password": "nope-nope" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let t = TestApp::new().await;
    t.customer("hari@example.com", "9800000001").await;

    let (status, _) = t
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "full_name": "Someone Else",
                "email": "HARI@example.com",
                "password": "password123",
                "phone": "9800000002",
            })),
        )
        .await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_back_office_requires_approved_staff() {
    let t = TestApp::new().await;
    let customer = t.customer("hari@example.com", "9800000001").await;

    let (status, _) = t.send("GET", "/staff/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.send("GET", "/staff/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = t
        .send(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "full_name": "Staff Member",
                "email": "staff@example.com",
                "password": "password123",
                "phone": "9800000003",
                "role": "staff",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["is_approved"], false);
    let staff_id = json["id"].as_str().unwrap().to_string();

    let (status, _) = t
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "staff@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = t.admin_token().await;
    let (status, json) = t
        .send("GET", "/admin/profiles?pending=true", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, _) = t
        .send(
            "POST",
            &format!("/admin/profiles/{staff_id}/approve"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let staff = t.login("staff@example.com", "password123").await;
    let (status, _) = t.send("GET", "/staff/orders", Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.send("GET", "/admin/users", Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cod_checkout_decrements_stock() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let sofa = t.product(&admin, "Oslo Sofa", 45_000, 3).await;
    let customer = t.customer("hari@example.com", "9800000001").await;

    let (status, json) = t.checkout(&customer, &sofa, 2, "COD").await;

    assert_eq!(status, StatusCode::CREATED, "checkout failed: {json}");
    assert_eq!(json["order"]["status"], "Pending");
    assert_eq!(json["order"]["payment_method"], "COD");
    assert_eq!(json["order"]["total"]["paisa"], 9_000_000);
    assert!(json["payment"].is_null());
    assert!(
        json["order"]["tracking_number"]
            .as_str()
            .unwrap()
            .starts_with("FNQ-")
    );

    let (_, product) = t.send("GET", &format!("/products/{sofa}"), None, None).await;
    assert_eq!(product["stock"], 1);

    let (status, orders) = t.send("GET", "/account/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_beyond_stock_is_conflict() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let sofa = t.product(&admin, "Oslo Sofa", 45_000, 1).await;
    let customer = t.customer("hari@example.com", "9800000001").await;

    let (status, json) = t.checkout(&customer, &sofa, 2, "COD").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("Oslo Sofa"));

    let (_, product) = t.send("GET", &format!("/products/{sofa}"), None, None).await;
    assert_eq!(product["stock"], 1);
}

#[tokio::test]
async fn test_checkout_requires_sign_in_and_valid_method() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let sofa = t.product(&admin, "Oslo Sofa", 45_000, 1).await;

    let (status, _) = t
        .send(
            "POST",
            "/checkout",
            None,
            Some(json!({
                "items": [{ "product_id": sofa, "quantity": 1 }],
                "payment_method": "COD",
                "address": "Lazimpat",
                "phone": "9800000001",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer = t.customer("hari@example.com", "9800000001").await;
    let (status, _) = t.checkout(&customer, &sofa, 1, "Bitcoin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = t
        .send(
            "POST",
            "/checkout",
            Some(&customer),
            Some(json!({
                "items": [
                    { "product_id": sofa, "quantity": u32::MAX },
                    { "product_id": sofa, "quantity": 2 },
                ],
                "payment_method": "COD",
                "address": "Lazimpat",
                "phone": "9800000001",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn test_khalti_callback_marks_order_paid() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let table = t.product(&admin, "Teak Table", 25_000, 2).await;
    let customer = t.customer("sita@example.com", "9800000002").await;

    let (status, placed) = t.checkout(&customer, &table, 1, "Khalti").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["payment"]["type"], "redirect");
    let pidx = placed["payment"]["pidx"].as_str().unwrap().to_string();
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(t.khalti.initiated_count(), 1);

    let (status, json) = t
        .send(
            "GET",
            &format!("/payments/khalti/verify?pidx={pidx}&status=Completed"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "verify failed: {json}");
    assert_eq!(json["order"]["payment_status"], "Completed");

    let (status, receipt) = t
        .send(
            "GET",
            &format!("/payments/success?order_id={order_id}"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["order"]["payment_status"], "Completed");
}

#[tokio::test]
async fn test_unsettled_khalti_payment_is_refused() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let table = t.product(&admin, "Teak Table", 25_000, 2).await;
    let customer = t.customer("sita@example.com", "9800000002").await;

    let (_, placed) = t.checkout(&customer, &table, 1, "Khalti").await;
    let pidx = placed["payment"]["pidx"].as_str().unwrap().to_string();
    t.khalti.set_reported_status(Some("User canceled"));

    let (status, _) = t
        .send(
            "GET",
            &format!("/payments/khalti/verify?pidx={pidx}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_staff_status_change_and_public_tracking() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let sofa = t.product(&admin, "Oslo Sofa", 45_000, 3).await;
    let customer = t.customer("hari@example.com", "9800000001").await;
    let (_, placed) = t.checkout(&customer, &sofa, 1, "COD").await;
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();
    let tracking = placed["order"]["tracking_number"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, json) = t
        .send(
            "POST",
            &format!("/staff/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "Confirmed", "notes": "called customer" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Confirmed");

    let (status, json) = t
        .send(
            "POST",
            &format!("/staff/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "Confirmed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Confirmed");

    let (status, detail) = t
        .send(
            "POST",
            "/orders/track",
            None,
            Some(json!({ "tracking_number": tracking.to_lowercase(), "phone": "9800000001" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["order"]["status"], "Confirmed");
    assert_eq!(detail["history"].as_array().unwrap().len(), 1);

    let (status, _) = t
        .send(
            "POST",
            "/orders/track",
            None,
            Some(json!({ "tracking_number": tracking, "phone": "9811111111" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, history) = t.send("GET", "/admin/history", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["notes"], "called customer");

    for (next, notes) in [("Delivered", ""), ("Shipped", "marked delivered by mistake")] {
        let (status, json) = t
            .send(
                "PUT",
                &format!("/admin/orders/{order_id}"),
                Some(&admin),
                Some(json!({ "status": next, "notes": notes })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], next);
    }

    let (_, history) = t.send("GET", "/admin/history", Some(&admin), None).await;
    assert_eq!(history.as_array().unwrap().len(), 3);
    assert_eq!(history[0]["old_status"], "Delivered");
    assert_eq!(history[0]["new_status"], "Shipped");
}

#[tokio::test]
async fn test_nepal_post_tracking() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let sofa = t.product(&admin, "Oslo Sofa", 45_000, 3).await;
    let customer = t.customer("hari@example.com", "9800000001").await;
    let (_, placed) = t.checkout(&customer, &sofa, 1, "COD").await;
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();
    let tracking = placed["order"]["tracking_number"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, json) = t
        .send("GET", &format!("/shipments/track/{tracking}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json["error"],
        "This order has not been assigned to Nepal Post yet."
    );

    let (status, shipment) = t
        .send(
            "POST",
            &format!("/admin/orders/{order_id}/shipment"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let shipment_id = shipment["id"].as_str().unwrap().to_string();
    let np_number = shipment["tracking_number"].as_str().unwrap().to_string();
    assert!(np_number.starts_with("NP-"));

    let (status, _) = t
        .send(
            "POST",
            &format!("/admin/shipments/{shipment_id}/events"),
            Some(&admin),
            Some(json!({
                "location": "Kathmandu Sorting Center",
                "status": "In Transit",
                "description": "Departed sorting center",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = t
        .send("GET", &format!("/shipments/track/{np_number}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_location"], "Kathmandu Sorting Center");
    assert_eq!(json["order"]["tracking_number"], tracking);
    assert!(json["order"].get("delivery").is_none());
}

#[tokio::test]
async fn test_hidden_products_leave_the_storefront() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let sofa = t.product(&admin, "Oslo Sofa", 45_000, 3).await;
    t.product(&admin, "Teak Table", 25_000, 2).await;

    let (status, _) = t
        .send(
            "POST",
            &format!("/admin/products/{sofa}/toggle"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = t.send("GET", "/products", None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let (status, _) = t.send("GET", &format!("/products/{sofa}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, all) = t.send("GET", "/admin/products", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, found) = t.send("GET", "/search?q=teak", None, None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (status, _) = t.send("GET", "/categories/garden", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_adjusts_stock() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let sofa = t.product(&admin, "Oslo Sofa", 45_000, 3).await;

    let (status, json) = t
        .send(
            "POST",
            &format!("/staff/products/{sofa}/stock"),
            Some(&admin),
            Some(json!({ "set": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stock"], 10);

    let (_, json) = t
        .send(
            "POST",
            &format!("/staff/products/{sofa}/stock"),
            Some(&admin),
            Some(json!("decrease")),
        )
        .await;
    assert_eq!(json["stock"], 9);

    let (status, _) = t
        .send(
            "POST",
            &format!("/staff/products/{sofa}/stock"),
            Some(&admin),
            Some(json!({ "set": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_addresses_saved_items_and_notifications() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let sofa = t.product(&admin, "Oslo Sofa", 45_000, 3).await;
    let customer = t.customer("hari@example.com", "9800000001").await;

    let (status, address) = t
        .send(
            "POST",
            "/account/addresses",
            Some(&customer),
            Some(json!({
                "full_name": "Hari",
                "phone": "9800000001",
                "line1": "Lazimpat",
                "city": "Kathmandu",
                "state": "Bagmati",
                "postal_code": "44600",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "address failed: {address}");

    let (status, _) = t
        .send(
            "POST",
            "/account/saved-items",
            Some(&customer),
            Some(json!({ "product_id": sofa })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, saved) = t
        .send("GET", "/account/saved-items", Some(&customer), None)
        .await;
    assert_eq!(saved[0]["product"]["name"], "Oslo Sofa");

    let (status, _) = t
        .send(
            "DELETE",
            &format!("/account/saved-items/{sofa}"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    t.checkout(&customer, &sofa, 1, "COD").await;
    let (_, unread) = t
        .send("GET", "/notifications?unread=true", Some(&customer), None)
        .await;
    assert_eq!(unread.as_array().unwrap().len(), 1);

    let (status, json) = t
        .send("POST", "/notifications/read-all", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated"], 1);
    let (_, unread) = t
        .send("GET", "/notifications?unread=true", Some(&customer), None)
        .await;
    assert!(unread.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let t = TestApp::new().await;
    let admin = t.admin_token().await;
    let (_, me) = t.send("GET", "/account/profile", Some(&admin), None).await;
    let admin_id = me["id"].as_str().unwrap().to_string();

    let (status, _) = t
        .send(
            "DELETE",
            &format!("/admin/users/{admin_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = t
        .send("DELETE", "/admin/users/not-a-uuid", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Invalid ID format"));
}
