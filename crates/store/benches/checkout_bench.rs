use chrono::Utc;
use common::UserId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Cart, CartLine, Category, CheckoutRequest, DeliveryDetails, Money, NewProduct, OrderStatus,
    PaymentMethod, Product, Profile, Role, User,
};
use store::{AccountStore, CatalogStore, InMemoryStore, OrderQuery, OrderStore, ProductQuery};

async fn seeded_store(products: usize) -> (InMemoryStore, UserId, Vec<Product>) {
    let store = InMemoryStore::new();
    let user = User {
        id: UserId::new(),
        email: "bench@furniq.test".into(),
        full_name: "Bench Customer".into(),
        password_hash: "hash".into(),
        role: Role::Customer,
        is_active: true,
        date_joined: Utc::now(),
    };
    let profile = Profile {
        user_id: user.id,
        phone_number: "9800000000".into(),
        is_approved: true,
        created_at: Utc::now(),
    };
    let customer = user.id;
    store.insert_user(user, profile).await.unwrap();

    let mut catalog = Vec::new();
    for i in 0..products {
        let product = Product::create(
            NewProduct::new(
                format!("Bench Table {i}"),
                Category::Dining,
                Money::from_rupees(10_000),
                u32::MAX / 2,
            ),
            Utc::now(),
        )
        .unwrap();
        catalog.push(store.insert_product(product).await.unwrap());
    }
    (store, customer, catalog)
}

fn request(products: &[Product]) -> CheckoutRequest {
    CheckoutRequest {
        cart: Cart::new(
            products
                .iter()
                .map(|p| CartLine {
                    product_id: p.id,
                    quantity: 1,
                })
                .collect(),
        )
        .unwrap(),
        payment_method: PaymentMethod::Cod,
        delivery: DeliveryDetails::new("Baneshwor, Kathmandu", "9800000000", "").unwrap(),
        requested_delivery_date: None,
    }
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, customer, catalog) = rt.block_on(seeded_store(5));

    c.bench_function("store/place_order_5_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.place_order(customer, request(&catalog)).await.unwrap();
            });
        });
    });
}

fn bench_change_status(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, customer, catalog) = rt.block_on(seeded_store(1));
    let staff = customer;

    c.bench_function("store/place_and_confirm", |b| {
        b.iter(|| {
            rt.block_on(async {
                let order = store.place_order(customer, request(&catalog)).await.unwrap();
                store
                    .change_status(order.id, OrderStatus::Confirmed, staff, String::new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_queries(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, customer, catalog) = rt.block_on(seeded_store(200));
    rt.block_on(async {
        for _ in 0..200 {
            store
                .place_order(customer, request(&catalog[..3]))
                .await
                .unwrap();
        }
    });

    c.bench_function("store/query_products_search", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .query_products(ProductQuery::storefront().search("table 1").limit(20))
                    .await
                    .unwrap()
            })
        });
    });

    c.bench_function("store/query_orders_for_customer", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .query_orders(OrderQuery::for_customer(customer).limit(20))
                    .await
                    .unwrap()
            })
        });
    });
}

criterion_group!(benches, bench_place_order, bench_change_status, bench_queries);
criterion_main!(benches);
