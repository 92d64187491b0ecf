use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::Utc;
use pharmacy_auth::{NewUser, Role, User};
use pharmacy_catalog::{Category, Product, ProductDraft};
use pharmacy_core::{OrderId, ProductId, UserId};
use pharmacy_infra::{EntityStore, InMemoryEntityStore, LifecycleConfig, OrderLifecycleManager};
use pharmacy_sales::{Order, OrderDetail};

type Store = Arc<InMemoryEntityStore>;

fn seed(products: usize) -> (Store, UserId, Vec<ProductId>) {
    let store = Arc::new(InMemoryEntityStore::new());
    let user = User::register(
        NewUser {
            username: "bench".to_string(),
            password_credential: "hash".to_string(),
            email: "bench@example.com".to_string(),
            display_name: "Bench".to_string(),
            role: Role::Customer,
        },
        Utc::now(),
    )
    .unwrap();
    let user_id = store.insert(&user).unwrap();
    let category = store.insert(&Category::new("General").unwrap()).unwrap();

    let product_ids = (0..products)
        .map(|i| {
            let product = Product::new(ProductDraft {
                name: format!("Product {i}"),
                price_cents: 100 + i as u64,
                stock: (i % 10) as i64,
                category_id: category,
            })
            .unwrap();
            store.insert(&product).unwrap()
        })
        .collect();

    (store, user_id, product_ids)
}

fn bench_place_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_order");

    for lines in [1usize, 5, 20] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            let (store, user, products) = seed(lines);
            let manager = OrderLifecycleManager::new(store, LifecycleConfig::default());
            b.iter(|| {
                let details = products
                    .iter()
                    .map(|p| OrderDetail::new(OrderId::UNASSIGNED, *p, 2))
                    .collect();
                black_box(manager.place_order(Order::place(user, Utc::now()), details).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_guard_scans(c: &mut Criterion) {
    let mut group = c.benchmark_group("guard_scans");

    for orders in [10usize, 100, 1000] {
        let (store, user, products) = seed(10);
        let manager = OrderLifecycleManager::new(store, LifecycleConfig::default());
        for _ in 0..orders {
            manager
                .place_order(
                    Order::place(user, Utc::now()),
                    vec![OrderDetail::new(OrderId::UNASSIGNED, products[0], 1)],
                )
                .unwrap();
        }

        group.bench_with_input(
            BenchmarkId::new("validate_user_deletion", orders),
            &orders,
            |b, _| b.iter(|| black_box(manager.integrity().validate_user_deletion(user).is_err())),
        );
        group.bench_with_input(
            BenchmarkId::new("low_stock_scan", orders),
            &orders,
            |b, _| {
                b.iter(|| {
                    black_box(
                        manager
                            .notifier()
                            .check_low_stock(0, user)
                            .unwrap(),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_place_order, bench_guard_scans);
criterion_main!(benches);
