//! 記憶體內的儲存實作
//!
//! 供測試與示範使用。可注入下一次請求的失敗，並計算請求次數。

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use shop_core::{
    AdminError, Brand, NewProduct, Order, OrderField, Patch, Product, ProductField, Record,
    Result, DEFAULT_LOW_STOCK_THRESHOLD,
};
use tracing::debug;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::store::{ListPage, OrderQuery, ProductQuery, ProductSort, RecordStore};

#[derive(Debug, Default)]
struct Faults {
    next: RefCell<Option<AdminError>>,
    requests: Cell<usize>,
}

impl Faults {
    /// 記錄一次請求；有注入的失敗時回傳它
    fn request(&self) -> Result<()> {
        self.requests.set(self.requests.get() + 1);
        match self.next.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// 記憶體內的記錄儲存
#[derive(Debug)]
pub struct MemoryStore {
    products: Vec<Product>,
    orders: Vec<Order>,
    brands: Vec<Brand>,
    low_stock_threshold: i64,
    faults: Faults,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
            orders: Vec::new(),
            brands: Vec::new(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            faults: Faults::default(),
        }
    }

    /// 建構器模式：設置低庫存門檻
    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    /// 建構器模式：加入品牌
    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brands.push(brand);
        self
    }

    /// 建構器模式：加入商品（品牌一併登記）
    pub fn with_product(mut self, product: Product) -> Self {
        if let Some(brand) = &product.brand {
            if !self.brands.iter().any(|b| b.id == brand.id) {
                self.brands.push(brand.clone());
            }
        }
        self.products.push(product);
        self
    }

    /// 建構器模式：加入訂單
    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// 下一次請求以指定錯誤失敗
    pub fn fail_next(&self, err: AdminError) {
        *self.faults.next.borrow_mut() = Some(err);
    }

    /// 至今的請求次數
    pub fn request_count(&self) -> usize {
        self.faults.requests.get()
    }

    pub fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn order(&self, id: Uuid) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn brands(&self) -> &[Brand] {
        &self.brands
    }

    fn brand_by_id(&self, id: Uuid) -> Result<Brand> {
        self.brands
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| AdminError::Transport(format!("違反外鍵約束：品牌 {} 不存在", id)))
    }

    /// 依名稱取得品牌，不存在時建立
    fn upsert_brand(&mut self, name: &str) -> Brand {
        let name = name.trim();
        if let Some(brand) = self.brands.iter().find(|b| b.name == name) {
            return brand.clone();
        }
        let brand = Brand::new(name);
        debug!("建立品牌 {}", brand.name);
        self.brands.push(brand.clone());
        brand
    }
}

impl RecordStore for MemoryStore {
    fn list_products(&self, query: &ProductQuery) -> Result<ListPage<Product>> {
        self.faults.request()?;

        let mut matched: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| query.stock_status.map_or(true, |s| p.stock_status == s))
            .filter(|p| query.brands.is_empty() || query.brands.iter().any(|b| b == p.brand_name()))
            .collect();

        match query.sort_by.unwrap_or(ProductSort::Newest) {
            ProductSort::Newest => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ProductSort::PriceAsc => matched.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => matched.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::Title => matched.sort_by(|a, b| a.title.cmp(&b.title)),
        }

        let total = matched.len();
        let items = query.pagination.slice(&matched).into_iter().cloned().collect();
        Ok(ListPage::new(items, total))
    }

    fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        self.faults.request()?;
        Ok(self.product(id).cloned())
    }

    fn insert_product(&mut self, payload: NewProduct) -> Result<Product> {
        self.faults.request()?;

        let brand = match (payload.brand_id, payload.brand_name.as_deref()) {
            (Some(id), _) => Some(self.brand_by_id(id)?),
            (None, Some(name)) => Some(self.upsert_brand(name)),
            (None, None) => None,
        };

        let product = payload.into_product(brand, self.low_stock_threshold)?;
        self.products.push(product.clone());
        Ok(product)
    }

    fn update_product(&mut self, id: Uuid, patch: &Patch<ProductField>) -> Result<Product> {
        self.faults.request()?;

        let index = self
            .products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AdminError::not_found("product", id))?;

        let mut next = self.products[index].clone();
        next.apply_patch(patch)?;
        if let Some(brand) = next.brand.as_mut() {
            if brand.name.is_empty() {
                *brand = self.brand_by_id(brand.id)?;
            }
        }
        if patch.contains(ProductField::Stock) {
            next.refresh_stock_status(self.low_stock_threshold);
        }

        self.products[index] = next.clone();
        Ok(next)
    }

    fn delete_product(&mut self, id: Uuid) -> Result<()> {
        self.faults.request()?;

        let index = self
            .products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AdminError::not_found("product", id))?;
        self.products.remove(index);
        Ok(())
    }

    fn list_orders(&self, query: &OrderQuery) -> Result<ListPage<Order>> {
        self.faults.request()?;

        let search = query.search.trim();
        let mut matched: Vec<&Order> = self
            .orders
            .iter()
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .filter(|o| search.is_empty() || o.matches_search(search))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len();
        let items = query.pagination.slice(&matched).into_iter().cloned().collect();
        Ok(ListPage::new(items, total))
    }

    fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        self.faults.request()?;
        Ok(self.order(id).cloned())
    }

    fn update_order(&mut self, id: Uuid, patch: &Patch<OrderField>) -> Result<Order> {
        self.faults.request()?;

        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| AdminError::not_found("order", id))?;
        order.apply_patch(patch)?;
        Ok(order.clone())
    }

    fn list_brands(&self) -> Result<Vec<Brand>> {
        self.faults.request()?;

        let mut brands = self.brands.clone();
        brands.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(brands)
    }
}

/// 記憶體內的物件儲存
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: BTreeMap<String, (Vec<u8>, String)>,
    faults: Faults,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 下一次上傳以指定錯誤失敗
    pub fn fail_next(&self, err: AdminError) {
        *self.faults.next.borrow_mut() = Some(err);
    }

    pub fn get(&self, stored_path: &str) -> Option<&[u8]> {
        self.objects.get(stored_path).map(|(bytes, _)| bytes.as_slice())
    }

    pub fn content_type(&self, stored_path: &str) -> Option<&str> {
        self.objects.get(stored_path).map(|(_, ct)| ct.as_str())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&mut self, bucket: &str, path: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        self.faults.request()?;

        let stored = format!("{}/{}", bucket, path);
        if self.objects.contains_key(&stored) {
            return Err(AdminError::Transport(format!("物件已存在: {}", stored)));
        }
        self.objects
            .insert(stored.clone(), (bytes.to_vec(), content_type.to_string()));
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use shop_core::{OrderStatus, StockStatus};

    fn catalog() -> MemoryStore {
        let nike = Brand::new("Nike");
        let puma = Brand::new("Puma");
        let start = Utc::now();
        MemoryStore::new()
            .with_product(
                Product::new("Air Max", Decimal::from(120), 50)
                    .with_brand(nike.clone())
                    .with_created_at(start),
            )
            .with_product(
                Product::new("Pegasus", Decimal::from(90), 3)
                    .with_brand(nike)
                    .with_created_at(start + Duration::minutes(1)),
            )
            .with_product(
                Product::new("Suede", Decimal::from(70), 0)
                    .with_brand(puma)
                    .with_created_at(start + Duration::minutes(2)),
            )
    }

    #[test]
    fn test_list_products_filters_and_sorts() {
        let store = catalog();

        let newest = store.list_products(&ProductQuery::new(1, 6)).unwrap();
        assert_eq!(newest.total, 3);
        assert_eq!(newest.items[0].title, "Suede");

        let nike = store
            .list_products(&ProductQuery::new(1, 6).with_brands(vec!["Nike".into()]).with_sort(ProductSort::PriceAsc))
            .unwrap();
        let titles: Vec<_> = nike.items.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Pegasus", "Air Max"]);

        let low = store
            .list_products(&ProductQuery::new(1, 6).with_stock_status(StockStatus::LowStock))
            .unwrap();
        assert_eq!(low.total, 1);
        assert_eq!(low.items[0].title, "Pegasus");
    }

    #[test]
    fn test_list_products_paginates() {
        let store = catalog();
        let page = store.list_products(&ProductQuery::new(2, 2)).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Air Max");
    }

    #[test]
    fn test_insert_upserts_brand_by_name() {
        let mut store = catalog();
        let payload = NewProduct::new("Court Vision", 65.0, 8.0)
            .with_brand_name("Nike")
            .with_description("Low-top sneaker")
            .with_images(vec!["products-images/nike/cv.jpg".into()]);

        let created = store.insert_product(payload).unwrap();
        assert_eq!(created.stock_status, StockStatus::LowStock);
        assert_eq!(store.brands().len(), 2);

        let payload = NewProduct::new("Classic", 80.0, 20.0)
            .with_brand_name("Reebok")
            .with_description("Leather classic")
            .with_images(vec!["x.jpg".into()]);
        store.insert_product(payload).unwrap();
        assert_eq!(store.brands().len(), 3);
    }

    #[test]
    fn test_insert_with_unknown_brand_id_fails() {
        let mut store = catalog();
        let payload = NewProduct::new("Ghost", 10.0, 1.0).with_brand_id(Uuid::new_v4());
        assert!(matches!(store.insert_product(payload), Err(AdminError::Transport(_))));
    }

    #[test]
    fn test_update_product_resolves_brand_and_stock_status() {
        let mut store = catalog();
        let air_max = store.list_products(&ProductQuery::new(1, 6).with_sort(ProductSort::Title)).unwrap().items[0].clone();
        let puma = store.brands().iter().find(|b| b.name == "Puma").cloned().unwrap();

        let patch = Patch::single(ProductField::BrandId, puma.id.to_string()).with(ProductField::Stock, 0i64);
        let updated = store.update_product(air_max.id, &patch).unwrap();

        assert_eq!(updated.brand_name(), "Puma");
        assert_eq!(updated.stock_status, StockStatus::OutOfStock);
        assert_eq!(store.product(air_max.id), Some(&updated));
    }

    #[test]
    fn test_rejected_patch_leaves_record_unchanged() {
        let mut store = catalog();
        let id = store.list_products(&ProductQuery::new(1, 6)).unwrap().items[0].id;
        let before = store.product(id).cloned();

        let patch = Patch::single(ProductField::Title, "Renamed").with(ProductField::Stock, 1.5);
        assert!(store.update_product(id, &patch).is_err());
        assert_eq!(store.product(id).cloned(), before);
    }

    #[test]
    fn test_delete_missing_product_is_not_found() {
        let mut store = catalog();
        let err = store.delete_product(Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_orders_search_status_and_order() {
        let start = Utc::now();
        let store = MemoryStore::new()
            .with_order(Order::new("Ana Silva", "ana@example.com").with_created_at(start))
            .with_order(
                Order::new("Bruno Costa", "bruno@example.com")
                    .with_status(OrderStatus::Shipped)
                    .with_created_at(start + Duration::minutes(1)),
            )
            .with_order(Order::new("Carla Ana", "carla@example.com").with_created_at(start + Duration::minutes(2)));

        let all = store.list_orders(&OrderQuery::new(1, 10)).unwrap();
        assert_eq!(all.items[0].full_name, "Carla Ana");

        let ana = store.list_orders(&OrderQuery::new(1, 10).with_search(" ANA ")).unwrap();
        assert_eq!(ana.total, 2);

        let shipped = store.list_orders(&OrderQuery::new(1, 10).with_status(OrderStatus::Shipped)).unwrap();
        assert_eq!(shipped.total, 1);
        assert_eq!(shipped.items[0].full_name, "Bruno Costa");
    }

    #[test]
    fn test_fault_injection_counts_requests() {
        let store = catalog();
        store.fail_next(AdminError::Transport("timeout".into()));

        assert!(store.list_brands().is_err());
        assert!(store.list_brands().is_ok());
        assert_eq!(store.request_count(), 2);
    }

    #[test]
    fn test_blob_store_refuses_overwrite() {
        let mut blobs = MemoryBlobStore::new();
        let stored = blobs.upload("bucket", "a/b.png", &[1, 2], "image/png").unwrap();
        assert_eq!(stored, "bucket/a/b.png");
        assert_eq!(blobs.get(&stored), Some(&[1u8, 2][..]));
        assert_eq!(blobs.content_type(&stored), Some("image/png"));
        assert!(blobs.upload("bucket", "a/b.png", &[3], "image/png").is_err());
    }
}
