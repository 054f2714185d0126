use criterion::{Criterion, criterion_group, criterion_main};
use doc_store::{
    Document, DocumentQuery, DocumentStore, InMemoryDocumentStore, PutOptions, SortDirection,
    SortKey, Version,
};

fn order_body(i: usize) -> serde_json::Value {
    serde_json::json!({
        "user_id": format!("user-{}", i % 10),
        "status": if i % 3 == 0 { "pending" } else { "delivered" },
        "totals": { "total": (i * 137) % 10_000 }
    })
}

fn bench_put_new(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("doc_store/put_new", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDocumentStore::new();
                let write = Document::builder()
                    .collection("orders")
                    .key("o1")
                    .body_raw(order_body(1))
                    .build()
                    .unwrap();
                store.put(write, PutOptions::expect_new()).await.unwrap();
            });
        });
    });
}

fn bench_versioned_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("doc_store/versioned_update_10", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDocumentStore::new();
                let mut version = Version::initial();
                for i in 0..10 {
                    let write = Document::builder()
                        .collection("products")
                        .key("p1")
                        .body_raw(serde_json::json!({ "stock": i }))
                        .build()
                        .unwrap();
                    version = store
                        .put(write, PutOptions::expecting(version))
                        .await
                        .unwrap()
                        .version;
                }
            });
        });
    });
}

fn bench_filtered_query(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();

    // Pre-populate with 1000 orders
    rt.block_on(async {
        for i in 0..1000 {
            let write = Document::builder()
                .collection("orders")
                .key(format!("o{i}"))
                .body_raw(order_body(i))
                .build()
                .unwrap();
            store.put(write, PutOptions::new()).await.unwrap();
        }
    });

    c.bench_function("doc_store/query_user_orders_sorted_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .query(
                        DocumentQuery::new("orders")
                            .filter("user_id", "user-3")
                            .sort_by(
                                SortKey::Field("totals.total".into()),
                                SortDirection::Descending,
                            )
                            .limit(20),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_put_new,
    bench_versioned_update,
    bench_filtered_query
);
criterion_main!(benches);
