//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{
    AddressDraft, Address, Cart, CartLine, Category, CheckoutError, CheckoutRequest,
    DeliveryDetails, Money, NewProduct, Notification, OrderStatus, PaymentMethod, PaymentStatus,
    Product, Profile, Role, Session, Shipment, SiteContent, StockAdjustment, User,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    AccountStore, CatalogStore, ContentStore, CustomerStore, NotificationStore, OrderQuery,
    OrderStore, OrderStoreExt, PostgresStore, ProductQuery, ShipmentStore, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query(
        "TRUNCATE TABLE users, profiles, sessions, products, orders, order_lines, \
         order_status_history, payments, addresses, saved_items, notifications, shipments, \
         site_content",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

async fn create_user(store: &PostgresStore, role: Role, email: &str, phone: &str) -> UserId {
    let user = User {
        id: UserId::new(),
        email: email.into(),
        full_name: "Asha Gurung".into(),
        password_hash: "hash".into(),
        role,
        is_active: true,
        date_joined: Utc::now(),
    };
    let profile = Profile {
        user_id: user.id,
        phone_number: phone.into(),
        is_approved: role != Role::Staff,
        created_at: Utc::now(),
    };
    let id = user.id;
    store.insert_user(user, profile).await.unwrap();
    id
}

async fn create_product(store: &PostgresStore, name: &str, rupees: i64, stock: u32) -> Product {
    let product = Product::create(
        NewProduct::new(name, Category::LivingRoom, Money::from_rupees(rupees), stock),
        Utc::now(),
    )
    .unwrap();
    store.insert_product(product).await.unwrap()
}

fn checkout(lines: &[(ProductId, u32)]) -> CheckoutRequest {
    CheckoutRequest {
        cart: Cart::new(
            lines
                .iter()
                .map(|(product_id, quantity)| CartLine {
                    product_id: *product_id,
                    quantity: *quantity,
                })
                .collect(),
        )
        .unwrap(),
        payment_method: PaymentMethod::Cod,
        delivery: DeliveryDetails::new("Thamel Marg, Kathmandu", "9800000010", "").unwrap(),
        requested_delivery_date: None,
    }
}

#[tokio::test]
#[serial]
async fn place_order_persists_everything_in_one_transaction() {
    let store = get_test_store().await;
    let customer = create_user(&store, Role::Customer, "asha@furniq.test", "9800000010").await;
    let staff = create_user(&store, Role::Staff, "staff@furniq.test", "9800000011").await;
    let sofa = create_product(&store, "Oslo Sofa", 85_000, 4).await;
    let chair = create_product(&store, "Dining Chair", 3_500, 10).await;

    let order = store
        .place_order(customer, checkout(&[(sofa.id, 1), (chair.id, 4)]))
        .await
        .unwrap();

    let loaded = store.get_order(order.id).await.unwrap();
    assert_eq!(loaded.tracking_number, order.tracking_number);
    assert_eq!(loaded.lines, order.lines);
    assert_eq!(loaded.total, Money::from_rupees(99_000));

    assert_eq!(store.get_product(sofa.id).await.unwrap().stock, 3);
    assert_eq!(store.get_product(chair.id).await.unwrap().stock, 6);

    let addresses = store.list_addresses(customer).await.unwrap();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].line1, "Thamel Marg, Kathmandu");

    assert_eq!(store.list_notifications(customer, false).await.unwrap().len(), 1);
    assert_eq!(store.list_notifications(staff, false).await.unwrap().len(), 1);

    let tracked = store
        .track_order(&order.tracking_number, "9800000010")
        .await
        .unwrap();
    assert_eq!(tracked.map(|o| o.id), Some(order.id));
    assert!(
        store
            .track_order(&order.tracking_number, "9800000099")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn insufficient_stock_rolls_back_whole_order() {
    let store = get_test_store().await;
    let customer = create_user(&store, Role::Customer, "asha@furniq.test", "9800000010").await;
    let sofa = create_product(&store, "Oslo Sofa", 85_000, 5).await;
    let lamp = create_product(&store, "Floor Lamp", 6_000, 1).await;

    let err = store
        .place_order(customer, checkout(&[(sofa.id, 2), (lamp.id, 3)]))
        .await
        .unwrap_err();

    match err {
        StoreError::Checkout(CheckoutError::InsufficientStock { name, available, .. }) => {
            assert_eq!(name, "Floor Lamp");
            assert_eq!(available, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.get_product(sofa.id).await.unwrap().stock, 5);
    assert!(
        store
            .query_orders(OrderQuery::for_customer(customer))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(store.list_addresses(customer).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn concurrent_checkouts_never_oversell() {
    let store = get_test_store().await;
    let sofa = create_product(&store, "Oslo Sofa", 85_000, 3).await;

    let mut customers = Vec::new();
    for i in 0..8 {
        customers.push(
            create_user(
                &store,
                Role::Customer,
                &format!("buyer{i}@furniq.test"),
                &format!("98000001{i:02}"),
            )
            .await,
        );
    }

    let attempts = customers.iter().map(|customer| {
        let store = store.clone();
        let customer = *customer;
        let request = checkout(&[(sofa.id, 1)]);
        async move { store.place_order(customer, request).await }
    });
    let results = futures_util::future::join_all(attempts).await;

    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 3);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
        e,
        StoreError::Checkout(CheckoutError::InsufficientStock { .. })
    )));
    assert_eq!(store.get_product(sofa.id).await.unwrap().stock, 0);
}

#[tokio::test]
#[serial]
async fn status_changes_are_audited() {
    let store = get_test_store().await;
    let customer = create_user(&store, Role::Customer, "asha@furniq.test", "9800000010").await;
    let staff = create_user(&store, Role::Staff, "staff@furniq.test", "9800000011").await;
    let sofa = create_product(&store, "Oslo Sofa", 85_000, 4).await;
    let order = store
        .place_order(customer, checkout(&[(sofa.id, 1)]))
        .await
        .unwrap();

    let (updated, change) = store
        .change_status(order.id, OrderStatus::Confirmed, staff, "Confirmed by phone".into())
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Confirmed);
    assert_eq!(updated.assigned_staff, Some(staff));
    assert_eq!(change.unwrap().notes, "Confirmed by phone");

    store
        .change_status(order.id, OrderStatus::Shipped, staff, String::new())
        .await
        .unwrap();
    let (updated, _) = store
        .change_status(order.id, OrderStatus::Cancelled, staff, "Returned".into())
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Cancelled);

    let history = store.status_history(order.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].new_status, OrderStatus::Cancelled);
    assert_eq!(history[0].old_status, OrderStatus::Shipped);
    assert_eq!(store.history_by_actor(staff, 10).await.unwrap().len(), 3);

    // Placed + three status updates.
    assert_eq!(store.list_notifications(customer, false).await.unwrap().len(), 4);
}

#[tokio::test]
#[serial]
async fn pending_orders_lead_the_page() {
    let store = get_test_store().await;
    let customer = create_user(&store, Role::Customer, "asha@furniq.test", "9800000010").await;
    let staff = create_user(&store, Role::Staff, "staff@furniq.test", "9800000011").await;
    let chair = create_product(&store, "Dining Chair", 8_000, 10).await;

    let mut placed = Vec::new();
    for _ in 0..5 {
        placed.push(
            store
                .place_order(customer, checkout(&[(chair.id, 1)]))
                .await
                .unwrap(),
        );
    }
    for order in &placed[1..] {
        store
            .change_status(order.id, OrderStatus::Confirmed, staff, String::new())
            .await
            .unwrap();
    }

    let page = store
        .query_orders(OrderQuery::new().pending_first().limit(2))
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, placed[0].id);
    assert_eq!(page[1].status, OrderStatus::Confirmed);
}

#[tokio::test]
#[serial]
async fn payments_are_recorded_once_per_transaction() {
    let store = get_test_store().await;
    let customer = create_user(&store, Role::Customer, "asha@furniq.test", "9800000010").await;
    let sofa = create_product(&store, "Oslo Sofa", 85_000, 4).await;
    let order = store
        .place_order(customer, checkout(&[(sofa.id, 1)]))
        .await
        .unwrap();

    let raw = serde_json::json!({"status": "Completed"});
    let first = store
        .complete_payment(order.id, PaymentMethod::Khalti, "TXN-42".into(), raw.clone())
        .await
        .unwrap();
    let again = store
        .complete_payment(order.id, PaymentMethod::Khalti, "TXN-42".into(), raw)
        .await
        .unwrap();
    assert_eq!(first.id, again.id);

    let order = store.get_order(order.id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Completed);

    store
        .set_payment_status(order.id, PaymentStatus::Refunded)
        .await
        .unwrap();
    let payments = store.payments_for_order(order.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Refunded);
    assert_eq!(payments[0].transaction_id.as_deref(), Some("TXN-42"));
}

#[tokio::test]
#[serial]
async fn unique_constraints_map_to_conflicts() {
    let store = get_test_store().await;
    create_user(&store, Role::Customer, "asha@furniq.test", "9800000010").await;

    let user = User {
        id: UserId::new(),
        email: "asha@furniq.test".into(),
        full_name: "Another Asha".into(),
        password_hash: "hash".into(),
        role: Role::Customer,
        is_active: true,
        date_joined: Utc::now(),
    };
    let profile = Profile {
        user_id: user.id,
        phone_number: "9800000020".into(),
        is_approved: true,
        created_at: Utc::now(),
    };
    assert!(matches!(
        store.insert_user(user, profile).await,
        Err(StoreError::Conflict(_))
    ));

    // Blank phone numbers may repeat.
    create_user(&store, Role::Admin, "admin1@furniq.test", "").await;
    create_user(&store, Role::Admin, "admin2@furniq.test", "").await;
}

#[tokio::test]
#[serial]
async fn catalog_queries_and_stock_adjustments() {
    let store = get_test_store().await;
    let sofa = create_product(&store, "Oslo Sofa", 85_000, 4).await;
    let mut hidden = create_product(&store, "Old Sofa", 20_000, 1).await;
    hidden.toggle_active();
    store.update_product(hidden).await.unwrap();

    let found = store
        .query_products(ProductQuery::storefront().search("sofa"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, sofa.id);

    let adjusted = store
        .adjust_stock(sofa.id, StockAdjustment::Decrease)
        .await
        .unwrap();
    assert_eq!(adjusted.stock, 3);
    assert!(
        store
            .adjust_stock(sofa.id, StockAdjustment::Set(-2))
            .await
            .is_err()
    );
}

#[tokio::test]
#[serial]
async fn sessions_addresses_and_notifications() {
    let store = get_test_store().await;
    let user = create_user(&store, Role::Customer, "asha@furniq.test", "9800000010").await;

    let session = Session::issue(user, chrono::Duration::hours(1), Utc::now());
    let token = session.token.clone();
    store.create_session(session).await.unwrap();
    assert_eq!(
        store.resolve_session(&token, Utc::now()).await.unwrap().map(|u| u.id),
        Some(user)
    );

    let draft = AddressDraft {
        full_name: "Asha Gurung".into(),
        phone: "9800000010".into(),
        line1: "Lakeside".into(),
        city: "Pokhara".into(),
        state: "Gandaki".into(),
        is_default: true,
        ..Default::default()
    };
    let first = Address::create(user, draft.clone(), Utc::now()).unwrap();
    let second = Address::create(user, draft, Utc::now()).unwrap();
    store.save_address(first).await.unwrap();
    store.save_address(second.clone()).await.unwrap();
    let addresses = store.list_addresses(user).await.unwrap();
    assert_eq!(addresses.iter().filter(|a| a.is_default).count(), 1);
    assert_eq!(addresses[0].id, second.id);

    store
        .insert_notification(Notification::new(user, "Hello", Utc::now()))
        .await
        .unwrap();
    assert_eq!(store.mark_all_read(user).await.unwrap(), 1);
    assert!(store.list_notifications(user, true).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn shipments_and_site_content() {
    let store = get_test_store().await;
    let customer = create_user(&store, Role::Customer, "asha@furniq.test", "9800000010").await;
    let sofa = create_product(&store, "Oslo Sofa", 85_000, 4).await;
    let order = store
        .place_order(customer, checkout(&[(sofa.id, 1)]))
        .await
        .unwrap();

    let shipment = store
        .insert_shipment(Shipment::new(order.id, Utc::now()))
        .await
        .unwrap();
    assert!(matches!(
        store.insert_shipment(Shipment::new(order.id, Utc::now())).await,
        Err(StoreError::Conflict(_))
    ));

    let updated = store
        .add_tracking_event(
            shipment.id,
            "Kathmandu Hub".into(),
            "In Transit".into(),
            "Left the sorting centre".into(),
        )
        .await
        .unwrap();
    assert_eq!(updated.history.len(), 1);
    let found = store
        .find_shipment_by_number(&shipment.tracking_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.current_location, "Kathmandu Hub");

    assert_eq!(store.get_content().await.unwrap(), SiteContent::default());
    let mut content = SiteContent::default();
    content.header_title = "FurniQ Nepal".into();
    store.save_content(content.clone()).await.unwrap();
    assert_eq!(store.get_content().await.unwrap(), content);
}
