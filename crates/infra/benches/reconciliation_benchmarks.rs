use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ordersync_core::StoreId;
use ordersync_infra::config::{Credentials, SyncConfig};
use ordersync_infra::reconcile::OrderReconciler;
use ordersync_infra::store::InMemoryEntityStore;
use ordersync_inventory::{Product, StockItem};
use ordersync_sales::{OrderPayload, TotalCodes, aggregate, decompose};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

fn config() -> SyncConfig {
    SyncConfig::new(Credentials {
        app_id: "bench".into(),
        app_key: "bench".into(),
        marketplace_id: "1".into(),
        web_url: "https://marketplace.invalid".into(),
    })
}

fn payload(reference: u64, lines: u64) -> OrderPayload {
    let items: Vec<_> = (0..lines)
        .map(|n| {
            json!({
                "order_item_id": reference * 1000 + n,
                "name": format!("Widget {n}"),
                "quantity": 1 + n % 3,
                "item": { "item_id": n, "variation_id": n, "sku": format!("SKU{}**{}", n % 10, 1 + n % 4) },
                "local_order_item_financials": { "price": "9.95", "payment": "8.50", "tax": "1.10" }
            })
        })
        .collect();
    OrderPayload::from_json(json!({
        "order_id": reference,
        "marketplace_id": 1,
        "marketplace_order_reference": format!("B{reference}"),
        "status": "paid",
        "addresses": [{
            "language_code": "en-GB",
            "name": "Bench Customer",
            "contact_email_1": "bench@example.invalid"
        }],
        "order_items": items,
        "marketplace_to_local_exchange_rate_applied": "1.25"
    }))
    .unwrap()
}

fn seeded_store() -> Arc<InMemoryEntityStore> {
    let store = Arc::new(InMemoryEntityStore::new());
    let global = StoreId::global();
    for n in 0..10 {
        let sku = format!("SKU{n}");
        store.insert_product(&global, Product::new(sku.clone(), "Widget")).unwrap();
        store.insert_stock_item(&global, StockItem::new(sku, 1_000_000)).unwrap();
    }
    store
}

fn bench_bundle_decomposition(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle_decomposition");

    for sku in ["PLAIN-SKU", "BUNDLE**12", "A**B**3", "BAD**012"] {
        group.bench_with_input(BenchmarkId::from_parameter(sku), &sku, |b, sku| {
            b.iter(|| decompose(black_box(sku), "**"));
        });
    }

    group.finish();
}

fn bench_financial_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("financial_aggregation");
    let codes = TotalCodes::default();

    for lines in [1u64, 10, 100] {
        let payload = payload(1, lines);
        group.throughput(Throughput::Elements(lines));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &payload, |b, payload| {
            b.iter(|| aggregate(black_box(&payload.order_items), &codes, Decimal::new(125, 2)).unwrap());
        });
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    let config = Arc::new(config());

    // Every iteration creates a fresh order.
    group.bench_function("create_order_10_lines", |b| {
        let store = seeded_store();
        let reconciler = OrderReconciler::new(store, config.clone());
        let mut reference = 0;
        b.iter(|| {
            reference += 1;
            reconciler.reconcile(&payload(reference, 10)).unwrap();
        });
    });

    // The same payload over and over: the update path.
    group.bench_function("update_order_10_lines", |b| {
        let store = seeded_store();
        let reconciler = OrderReconciler::new(store, config.clone());
        let payload = payload(1, 10);
        reconciler.reconcile(&payload).unwrap();
        b.iter(|| reconciler.reconcile(black_box(&payload)).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bundle_decomposition,
    bench_financial_aggregation,
    bench_reconcile
);
criterion_main!(benches);
