//! 集成測試

use std::sync::Arc;

use chrono::{Duration, Utc};
use rstest::rstest;
use rust_decimal::Decimal;
use shop_admin::cache::{FetchOutcome, IgnoreReason, ManualClock, QueryState};
use shop_admin::model::{Brand, FieldValue, OrderStatus, StockStatus};
use shop_admin::sync::{keys, MemoryStore, OrderQuery, ProductQuery, StaticSession};
use shop_admin::{
    AdminClient, AdminConfig, AdminError, DirtyTracker, Order, OrderField, Patch, Product,
    ProductField, QuerySource, SaveOutcome,
};
use uuid::Uuid;

type Client = AdminClient<MemoryStore, StaticSession>;

fn setup() -> (Client, ManualClock, Uuid) {
    let product = Product::new("Air Max", Decimal::from(10), 50).with_brand(Brand::new("Nike"));
    let id = product.id;
    let start = Utc::now();

    let mut store = MemoryStore::new().with_product(product);
    for i in 0..12 {
        store = store.with_order(
            Order::new(format!("Customer {}", i), format!("c{}@example.com", i))
                .with_created_at(start + Duration::minutes(i)),
        );
    }

    let clock = ManualClock::new(start);
    let client = AdminClient::with_clock(
        store,
        StaticSession::admin(),
        AdminConfig::default(),
        Box::new(clock.clone()),
    );
    (client, clock, id)
}

fn product_list() -> QuerySource {
    QuerySource::Products(ProductQuery::new(1, 6))
}

#[test]
fn test_update_then_read_returns_new_price() {
    let (mut client, _, id) = setup();

    // 1. 列表已在快取中且新鮮
    let list = client.mount(product_list());
    let before = client.view(list).unwrap();
    assert_eq!(before.state, QueryState::Fresh);

    // 2. 只送出變更的欄位
    let mut editor = client.edit_product(id).unwrap();
    editor.on_change(ProductField::Title, "Air Max");
    editor.on_change(ProductField::Price, 20.0);
    let patch = editor.changes().unwrap();
    assert_eq!(patch.field_names(), vec!["price"]);

    let saved = client.save_product_edits(id, &mut editor).unwrap();
    assert!(matches!(saved, SaveOutcome::Saved(_)));

    // 3. 列表與詳細頁都讀到新價格，且不需要再次等待
    let after = client.view(list).unwrap();
    assert_eq!(after.state, QueryState::Fresh);
    let page = after.data.unwrap();
    assert_eq!(page.as_products().unwrap().items[0].price, Decimal::from(20));

    let detail = client.fetch(QuerySource::Product(id)).unwrap();
    assert_eq!(detail.as_product().unwrap().price, Decimal::from(20));
}

#[test]
fn test_failed_mutation_leaves_cache_identical() {
    let (mut client, _, id) = setup();
    let list = client.mount(product_list());
    client.view(list);
    let cached = client.cache().get_cached(&product_list().key()).unwrap();

    client
        .store()
        .fail_next(AdminError::Transport("503 Service Unavailable".into()));
    let result = client.update_product(id, Patch::single(ProductField::Price, 20.0));
    assert!(matches!(result, Err(AdminError::Transport(_))));

    let still = client.cache().get_cached(&product_list().key()).unwrap();
    assert!(Arc::ptr_eq(&cached, &still));
    assert!(!client.cache().is_stale(&product_list().key()));
}

#[test]
fn test_abandoned_fetch_result_is_ignored() {
    let (mut client, _, _) = setup();
    let view = client.mount(QuerySource::Orders(OrderQuery::new(1, 10)));
    let ticket = client.begin_load(view).unwrap();

    // 視圖在回應到達前卸載
    client.unmount(view);
    let remounted = client.mount(QuerySource::Orders(OrderQuery::new(1, 10)));

    assert_eq!(
        client.finish_load(ticket),
        FetchOutcome::Ignored(IgnoreReason::Abandoned)
    );
    let snapshot = client.cache().read(remounted).unwrap();
    assert!(snapshot.data.is_none());
    assert_eq!(snapshot.state, QueryState::Stale);
}

#[test]
fn test_orders_pagination_keeps_previous_page_visible() {
    let (mut client, _, _) = setup();
    let view = client.mount(QuerySource::Orders(OrderQuery::new(1, 10)));
    let first = client.view(view).unwrap();
    let first_page = first.data.unwrap();
    assert_eq!(first_page.as_orders().unwrap().total, 12);
    assert_eq!(first_page.as_orders().unwrap().items[0].full_name, "Customer 11");

    client.navigate(view, QuerySource::Orders(OrderQuery::new(2, 10)));
    let ticket = client.begin_load(view).unwrap();
    let during = client.cache().read(view).unwrap();
    assert!(during.is_placeholder);
    assert!(Arc::ptr_eq(during.data.as_ref().unwrap(), &first_page));

    client.finish_load(ticket);
    let second = client.view(view).unwrap();
    assert!(!second.is_placeholder);
    assert_eq!(second.data.unwrap().as_orders().unwrap().items.len(), 2);
}

#[test]
fn test_order_status_change_refreshes_every_observed_orders_page() {
    let (mut client, _, _) = setup();
    let pending = client.mount(QuerySource::Orders(
        OrderQuery::new(1, 10).with_status(OrderStatus::Pending),
    ));
    let shipped = client.mount(QuerySource::Orders(
        OrderQuery::new(1, 10).with_status(OrderStatus::Shipped),
    ));
    let newest = client.view(pending).unwrap().data.unwrap().as_orders().unwrap().items[0].clone();
    assert_eq!(client.view(shipped).unwrap().data.unwrap().as_orders().unwrap().total, 0);

    let mut editor = client.edit_order(newest.id).unwrap();
    editor.on_change(OrderField::Status, "Shipped");
    client.save_order_edits(newest.id, &mut editor).unwrap();

    let shipped_now = client.view(shipped).unwrap().data.unwrap();
    assert_eq!(shipped_now.as_orders().unwrap().items[0].id, newest.id);
    let pending_now = client.view(pending).unwrap().data.unwrap();
    assert_eq!(pending_now.as_orders().unwrap().total, 11);
}

#[rstest]
#[case(ProductField::Price, FieldValue::Number(f64::NAN))]
#[case(ProductField::Title, FieldValue::from("ab"))]
#[case(ProductField::Stock, FieldValue::Number(-1.0))]
fn test_invalid_edits_never_reach_the_store(#[case] field: ProductField, #[case] value: FieldValue) {
    let (mut client, _, id) = setup();
    let mut editor = client.edit_product(id).unwrap();
    let requests = client.store().request_count();

    editor.on_change(field, value);
    let err = client.save_product_edits(id, &mut editor).unwrap_err();

    assert!(matches!(err, AdminError::Validation(_)));
    assert_eq!(client.store().request_count(), requests);
    assert!(editor.is_field_dirty(field));
}

#[test]
fn test_stale_time_follows_config() {
    let (mut client, clock, _) = setup();
    let orders = client.mount(QuerySource::Orders(OrderQuery::new(1, 10)));
    let brands = client.mount(QuerySource::Brands);
    client.view(orders);
    client.view(brands);

    clock.advance(Duration::minutes(3));
    assert_eq!(client.cache().state(&QuerySource::Orders(OrderQuery::new(1, 10)).key()), QueryState::Stale);
    assert_eq!(client.cache().state(&keys::brands_key()), QueryState::Fresh);
}

#[test]
fn test_stock_edit_recomputes_status() {
    let (mut client, _, id) = setup();
    let mut editor: DirtyTracker<ProductField> = client.edit_product(id).unwrap();
    editor.on_change(ProductField::Stock, 4i64);

    match client.save_product_edits(id, &mut editor).unwrap() {
        SaveOutcome::Saved(product) => assert_eq!(product.stock_status, StockStatus::LowStock),
        SaveOutcome::NothingToSave => panic!("庫存已變更"),
    }
}

#[test]
fn test_gc_drops_unobserved_queries() {
    let (mut client, clock, _) = setup();
    let view = client.mount(product_list());
    client.view(view);
    client.unmount(view);

    clock.advance(Duration::minutes(59));
    assert_eq!(client.collect_garbage(), 0);
    clock.advance(Duration::minutes(1));
    assert_eq!(client.collect_garbage(), 1);
    assert_eq!(client.source_count(), 0);
}

#[test]
fn test_abandoned_fetch_after_gc_stays_out_of_new_view() {
    let (mut client, clock, _) = setup();
    let first = client.mount(QuerySource::Orders(OrderQuery::new(1, 10)));
    let stale = client.begin_load(first).unwrap();
    client.unmount(first);

    clock.advance(Duration::hours(2));
    assert_eq!(client.collect_garbage(), 1);

    // 回收後重新開啟同一頁
    let second = client.mount(QuerySource::Orders(OrderQuery::new(1, 10)));
    let current = client.begin_load(second).unwrap();
    assert!(matches!(client.finish_load(stale), FetchOutcome::Ignored(_)));
    assert_eq!(client.cache().read(second).unwrap().state, QueryState::Fetching);

    assert_eq!(client.finish_load(current), FetchOutcome::Applied);
    let page = client.cache().read(second).unwrap().data.unwrap();
    assert_eq!(page.as_orders().unwrap().total, 12);
}
