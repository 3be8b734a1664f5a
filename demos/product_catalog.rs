//! 商品目錄示例
//!
//! 上傳內嵌圖片後建立商品、換頁時顯示舊頁資料，以及更新價格後
//! 列表與詳細頁同步更新。

use anyhow::Context;
use rust_decimal::Decimal;
use shop_admin::cache::QueryState;
use shop_admin::model::{Brand, NewProduct, StockStatus};
use shop_admin::sync::{ImagePipeline, MemoryBlobStore, MemoryStore, ProductQuery, ProductSort, StaticSession};
use shop_admin::{AdminClient, AdminConfig, Patch, Product, ProductField, QuerySource};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    println!("=== 商品目錄示例 ===\n");

    let config = AdminConfig::default()
        .with_public_storage_url("https://cdn.example.com/storage/v1/object/public/");
    config.validate()?;

    let nike = Brand::new("Nike");
    let mut store = MemoryStore::new().with_low_stock_threshold(config.low_stock_threshold);
    for (title, price, stock) in [
        ("Air Max 90", 120, 40),
        ("Pegasus 40", 110, 6),
        ("Blazer Mid", 95, 0),
        ("Cortez", 80, 25),
        ("Dunk Low", 100, 12),
        ("Court Vision", 65, 9),
        ("Killshot 2", 90, 30),
    ] {
        let mut product = Product::new(title, Decimal::from(price), stock).with_brand(nike.clone());
        product.refresh_stock_status(config.low_stock_threshold);
        store = store.with_product(product);
    }

    // 處理圖片：內嵌圖片上傳，公開網址去掉前綴
    let mut blobs = MemoryBlobStore::new();
    let images = ImagePipeline::from_config(&mut blobs, &config).process(
        &[
            "data:image/jpeg;base64,/9j/4AAQSkZJRg==".to_string(),
            "https://cdn.example.com/storage/v1/object/public/products-images/nike/side.jpg".to_string(),
        ],
        Some("Nike"),
    )?;
    println!("圖片路徑: {:?}", images);

    let page_size = config.product_page_size;
    let mut client = AdminClient::new(store, StaticSession::admin(), config);

    let created = client.create_product(
        NewProduct::new("Air Force 1", 110.0, 3.0)
            .with_brand_id(nike.id)
            .with_description("Classic leather sneaker")
            .with_sizes(vec!["41".into(), "42".into(), "43".into()])
            .with_images(images),
    )?;
    println!("已建立: {} ({})\n", created.title, created.stock_status.label());

    // 列表第一頁
    let query = ProductQuery::new(1, page_size).with_sort(ProductSort::PriceDesc);
    let list = client.mount(QuerySource::Products(query.clone()));
    print_page(&mut client, list, "第 1 頁")?;

    // 換到第二頁：新資料到達前仍顯示第一頁
    client.navigate(list, QuerySource::Products(query.page(2)));
    let ticket = client.begin_load(list).context("視圖未掛載")?;
    let pending = client.cache().read(list).context("視圖未掛載")?;
    println!(
        "\n換頁中: state={:?}, 顯示舊資料={}",
        pending.state, pending.is_placeholder
    );
    client.finish_load(ticket);
    print_page(&mut client, list, "第 2 頁")?;

    // 低庫存篩選
    let low = client.fetch(QuerySource::Products(
        ProductQuery::new(1, page_size).with_stock_status(StockStatus::LowStock),
    ))?;
    let low = low.as_products().context("查詢結果不是商品列表")?;
    println!("\n低庫存商品: {}", low.total);

    // 更新價格：列表與詳細頁立即重新抓取
    let detail = client.mount(QuerySource::Product(created.id));
    client.view(detail);
    client.update_product(created.id, Patch::single(ProductField::Price, 99.5))?;

    let snapshot = client.view(detail).context("視圖未掛載")?;
    let product = snapshot
        .data
        .as_deref()
        .and_then(|d| d.as_product())
        .context("找不到商品")?;
    println!(
        "\n更新後價格: {} (state={:?}, fresh={})",
        product.price,
        snapshot.state,
        snapshot.state == QueryState::Fresh
    );

    client.unmount(detail);
    client.unmount(list);
    println!("快取查詢數: {}", client.cache().len());

    Ok(())
}

fn print_page(
    client: &mut AdminClient<MemoryStore, StaticSession>,
    list: shop_admin::cache::ObserverId,
    title: &str,
) -> anyhow::Result<()> {
    let snapshot = client.view(list).context("視圖未掛載")?;
    let data = snapshot.data.context("商品列表沒有資料")?;
    let page = data.as_products().context("查詢結果不是商品列表")?;

    println!("{}（共 {} 筆）:", title, page.total);
    for product in &page.items {
        println!(
            "  - {:<14} {:>6}  庫存 {:>3}  {}",
            product.title,
            product.price,
            product.stock,
            product.stock_status.label()
        );
    }
    Ok(())
}
