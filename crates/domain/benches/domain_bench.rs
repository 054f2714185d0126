use std::collections::HashMap;

use chrono::{Duration, Utc};
use common::{ProductId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use doc_store::InMemoryDocumentStore;
use domain::{
    Aggregate, Cart, CartView, CheckoutPolicy, Discount, Money, Product, Repository,
    resolve_unit_price,
};

fn bench_resolve_unit_price(c: &mut Criterion) {
    let now = Utc::now();
    let discount = Discount::new(15, Some(now + Duration::days(1)));

    c.bench_function("domain/resolve_unit_price", |b| {
        b.iter(|| resolve_unit_price(std::hint::black_box(Money::from_cents(1999)), &discount, now));
    });
}

fn bench_cart_view(c: &mut Criterion) {
    let now = Utc::now();
    let mut cart = Cart::new(UserId::new());
    let mut products = HashMap::new();
    for i in 0..50 {
        let product = Product::new(
            ProductId::new(),
            format!("SKU-{i}"),
            format!("Item {i}"),
            Money::from_cents(100 + i),
            100,
        );
        let events = cart.add_item(&product, 2, now).unwrap();
        cart.apply_events(events);
        products.insert(product.id, product);
    }
    let policy = CheckoutPolicy::default();

    c.bench_function("domain/cart_view_50_lines", |b| {
        b.iter(|| CartView::compute(&cart, &products, &policy, now));
    });
}

fn bench_stock_reservation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repo: Repository<_, Product> = Repository::new(InMemoryDocumentStore::new());
    let product = Product::new(ProductId::new(), "BNCH", "Bench", Money::from_cents(100), u32::MAX);
    rt.block_on(async { repo.insert(&product).await.unwrap() });
    let key = product.id.to_string();

    c.bench_function("domain/reserve_stock", |b| {
        b.iter(|| {
            rt.block_on(async {
                repo.execute_with_retry(&key, 5, |p| p.reserve(1))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_resolve_unit_price,
    bench_cart_view,
    bench_stock_reservation
);
criterion_main!(benches);
