//! 訂單編輯示例
//!
//! 開啟訂單編輯、只送出變更的欄位，並觀察訂單列表如何被重新抓取。

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use shop_admin::cache::{Debounced, ObserverId};
use shop_admin::model::{OrderItem, OrderStatus};
use shop_admin::sync::{MemoryStore, OrderQuery, StaticSession};
use shop_admin::{AdminClient, AdminConfig, Order, OrderField, QuerySource, SaveOutcome};
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    println!("=== 訂單編輯示例 ===\n");

    let mut order = Order::new("Ana Silva", "ana@example.com")
        .with_address("Rua das Flores 12", "Lisboa", "1100-001")
        .with_phone("+351 912 345 678");
    order.add_item(OrderItem {
        product_id: Uuid::new_v4(),
        quantity: 2,
        size: "42".to_string(),
        color: None,
        product_price: Decimal::from(89),
        product_title: "Air Max".to_string(),
        product_image: "products-images/nike/air-max.jpg".to_string(),
    });
    let order_id = order.id;

    let config = AdminConfig::default();
    let page_size = config.order_page_size;
    let store = MemoryStore::new()
        .with_order(order)
        .with_order(Order::new("Bruno Costa", "bruno@example.com").with_status(OrderStatus::Shipped));
    let mut client = AdminClient::new(store, StaticSession::admin(), config);

    // 掛載訂單列表
    let list = client.mount(QuerySource::Orders(OrderQuery::new(1, page_size)));
    print_orders(&mut client, list)?;

    // 開啟編輯，只修改狀態與備註
    let mut editor = client.edit_order(order_id)?;
    editor.on_change(OrderField::Status, "Shipped");
    editor.on_change(OrderField::Notes, "Leave at the door");
    editor.on_change(OrderField::FullName, "Ana Silva");

    if let Some(patch) = editor.changes() {
        println!("\n送出欄位: {:?}", patch.field_names());
        println!("補丁內容: {}", patch.to_json());
    }

    match client.save_order_edits(order_id, &mut editor)? {
        SaveOutcome::Saved(order) => println!("已儲存，狀態: {}", order.status.label()),
        SaveOutcome::NothingToSave => println!("沒有變更"),
    }

    println!();
    print_orders(&mut client, list)?;

    // 再次儲存：沒有變更，不送出請求
    let requests = client.store().request_count();
    let outcome = client.save_order_edits(order_id, &mut editor)?;
    println!(
        "\n再次儲存: {:?}，請求數 {} -> {}",
        matches!(outcome, SaveOutcome::NothingToSave),
        requests,
        client.store().request_count()
    );

    // 搜尋輸入防抖：停止輸入後才切換查詢
    let mut search = Debounced::new(String::new(), client.config().search_debounce());
    let typed_at = Utc::now();
    for (i, text) in ["a", "an", "ana"].into_iter().enumerate() {
        search.set(text.to_string(), typed_at + Duration::milliseconds(100 * i as i64));
    }
    if let Some(term) = search.poll(typed_at + Duration::seconds(1)).cloned() {
        println!("\n搜尋 \"{}\":", term);
        client.navigate(list, QuerySource::Orders(OrderQuery::new(1, page_size).with_search(term)));
        print_orders(&mut client, list)?;
    }

    client.unmount(list);
    println!("\n回收閒置查詢: {}", client.collect_garbage());

    Ok(())
}

fn print_orders(
    client: &mut AdminClient<MemoryStore, StaticSession>,
    list: ObserverId,
) -> anyhow::Result<()> {
    let snapshot = client.view(list).context("視圖未掛載")?;
    let data = snapshot.data.context("訂單列表沒有資料")?;
    let page = data.as_orders().context("查詢結果不是訂單列表")?;

    println!("訂單列表（共 {} 筆）:", page.total);
    for order in &page.items {
        println!(
            "  - {} <{}> 狀態: {}, 總額: {}",
            order.full_name,
            order.email,
            order.status.label(),
            order.total
        );
    }
    Ok(())
}
