//! 後台客戶端
//!
//! 讀取一律經過查詢快取；寫入依照固定流程：
//! 權限檢查 → 驗證 → 送出請求 → 成功後失效相關查詢，並立即重新抓取
//! 仍有觀察者的查詢。請求失敗時不失效任何查詢，錯誤原樣回傳。

use std::collections::HashMap;
use std::sync::Arc;

use shop_cache::{
    CachePolicy, Clock, DirtyTracker, FetchOutcome, FetchTicket, ObserverId, QueryClient,
    QueryFilter, QueryKey, QuerySnapshot, SystemClock,
};
use shop_core::{
    AdminConfig, AdminError, Brand, NewProduct, Order, OrderField, Patch, Product, ProductField,
    Record, Result,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{require_admin, SessionProvider};
use crate::keys::{self, QuerySource};
use crate::store::{ListPage, RecordStore};

/// 快取中的查詢結果
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Products(ListPage<Product>),
    Product(Option<Product>),
    Orders(ListPage<Order>),
    Order(Option<Order>),
    Brands(Vec<Brand>),
}

impl QueryData {
    pub fn as_products(&self) -> Option<&ListPage<Product>> {
        match self {
            QueryData::Products(page) => Some(page),
            _ => None,
        }
    }

    /// 單一商品；不存在時為 None
    pub fn as_product(&self) -> Option<&Product> {
        match self {
            QueryData::Product(product) => product.as_ref(),
            _ => None,
        }
    }

    pub fn as_orders(&self) -> Option<&ListPage<Order>> {
        match self {
            QueryData::Orders(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_order(&self) -> Option<&Order> {
        match self {
            QueryData::Order(order) => order.as_ref(),
            _ => None,
        }
    }

    pub fn as_brands(&self) -> Option<&[Brand]> {
        match self {
            QueryData::Brands(brands) => Some(brands),
            _ => None,
        }
    }
}

/// 儲存編輯的結果
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome<T> {
    Saved(T),
    /// 沒有任何變更，未送出請求
    NothingToSave,
}

/// 後台客戶端
pub struct AdminClient<S, A> {
    store: S,
    session: A,
    cache: QueryClient<QueryData>,
    sources: HashMap<QueryKey, QuerySource>,
    config: AdminConfig,
}

impl<S: RecordStore, A: SessionProvider> AdminClient<S, A> {
    pub fn new(store: S, session: A, config: AdminConfig) -> Self {
        Self::with_clock(store, session, config, Box::new(SystemClock))
    }

    /// 使用指定時鐘創建（測試用）
    pub fn with_clock(store: S, session: A, config: AdminConfig, clock: Box<dyn Clock>) -> Self {
        let gc_time = config.gc_time();
        let default_policy = CachePolicy::new(config.stale_time_for(keys::PRODUCTS), gc_time);
        let mut cache = QueryClient::with_clock(default_policy, clock);
        for resource in [keys::PRODUCTS, keys::PRODUCT, keys::ORDERS, keys::ORDER, keys::BRANDS] {
            cache.set_policy(resource, CachePolicy::new(config.stale_time_for(resource), gc_time));
        }

        Self {
            store,
            session,
            cache,
            sources: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn session_mut(&mut self) -> &mut A {
        &mut self.session
    }

    pub fn cache(&self) -> &QueryClient<QueryData> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut QueryClient<QueryData> {
        &mut self.cache
    }

    fn register(&mut self, source: QuerySource) -> QueryKey {
        let source = source.normalized();
        let key = source.key();
        self.sources.entry(key.clone()).or_insert(source);
        key
    }

    /// 登記中的查詢來源數量
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// 回收閒置的快取項目，並一併移除已無快取項目的查詢來源；回傳回收數量
    pub fn collect_garbage(&mut self) -> usize {
        let removed = self.cache.collect_garbage();
        let cache = &self.cache;
        self.sources.retain(|key, _| cache.contains(key));
        removed
    }

    // ---------- 讀取 ----------

    /// 掛載視圖
    pub fn mount(&mut self, source: QuerySource) -> ObserverId {
        let key = self.register(source);
        self.cache.mount(&key)
    }

    /// 視圖改看另一個查詢（換頁、改篩選）；新資料到達前顯示舊資料
    pub fn navigate(&mut self, observer: ObserverId, source: QuerySource) {
        let key = self.register(source);
        self.cache.switch_key(observer, &key);
    }

    pub fn unmount(&mut self, observer: ObserverId) {
        self.cache.unmount(observer);
    }

    /// 讀取視圖目前的結果；過期時先抓取
    ///
    /// 抓取失敗不會回傳錯誤，而是記錄在快照的 `error` 中。
    pub fn view(&mut self, observer: ObserverId) -> Option<QuerySnapshot<QueryData>> {
        let key = self.cache.observed_key(observer)?.clone();
        if self.cache.needs_fetch(&key) {
            let ticket = self.cache.begin_fetch(&key, Some(observer));
            self.finish_load(ticket);
        }
        self.cache.read(observer)
    }

    /// 重試：不論新鮮與否重新抓取
    pub fn retry(&mut self, observer: ObserverId) -> Option<QuerySnapshot<QueryData>> {
        let key = self.cache.observed_key(observer)?.clone();
        let ticket = self.cache.refetch(&key, Some(observer));
        self.finish_load(ticket);
        self.cache.read(observer)
    }

    /// 開始抓取但暫不完成；回應由 [`Self::finish_load`] 送達
    pub fn begin_load(&mut self, observer: ObserverId) -> Option<FetchTicket> {
        let key = self.cache.observed_key(observer)?.clone();
        Some(self.cache.begin_fetch(&key, Some(observer)))
    }

    /// 送出請求並將回應交給快取；過時的回應會被忽略
    pub fn finish_load(&mut self, ticket: FetchTicket) -> FetchOutcome {
        let result = fetch_source(&self.store, &self.sources, ticket.key());
        self.cache.complete_fetch(ticket, result)
    }

    /// 不掛載視圖直接取得資料（新鮮時使用快取）
    pub fn fetch(&mut self, source: QuerySource) -> Result<Arc<QueryData>> {
        let key = self.register(source);
        let store = &self.store;
        let sources = &self.sources;
        self.cache
            .fetch_with(&key, None, |key| fetch_source(store, sources, key))
    }

    /// 以商品目前的內容開啟編輯追蹤器
    pub fn edit_product(&mut self, id: Uuid) -> Result<DirtyTracker<ProductField>> {
        let data = self.fetch(QuerySource::Product(id))?;
        let product = data
            .as_product()
            .ok_or_else(|| AdminError::not_found("product", id))?;
        Ok(DirtyTracker::with_snapshot(product.snapshot()))
    }

    /// 以訂單目前的內容開啟編輯追蹤器
    pub fn edit_order(&mut self, id: Uuid) -> Result<DirtyTracker<OrderField>> {
        let data = self.fetch(QuerySource::Order(id))?;
        let order = data
            .as_order()
            .ok_or_else(|| AdminError::not_found("order", id))?;
        Ok(DirtyTracker::with_snapshot(order.snapshot()))
    }

    // ---------- 寫入 ----------

    /// 建立商品
    pub fn create_product(&mut self, payload: NewProduct) -> Result<Product> {
        const ACTION: &str = "建立商品";
        require_admin(&self.session, ACTION)?;
        payload.validate()?;

        let creates_brand = payload.brand_id.is_none() && payload.brand_name.is_some();
        let product = self.commit(ACTION, |store| store.insert_product(payload))?;

        let mut filters = vec![keys::all_products()];
        if creates_brand {
            filters.push(QueryFilter::Exact(keys::brands_key()));
        }
        self.invalidate(&filters);
        Ok(product)
    }

    /// 更新商品部分欄位
    pub fn update_product(&mut self, id: Uuid, patch: Patch<ProductField>) -> Result<Product> {
        const ACTION: &str = "更新商品";
        require_admin(&self.session, ACTION)?;
        shop_core::product::validate_product_patch(&patch)?;

        let product = self.commit(ACTION, |store| store.update_product(id, &patch))?;
        self.invalidate(&[keys::all_products(), keys::one_product(product.id)]);
        Ok(product)
    }

    /// 刪除商品
    pub fn delete_product(&mut self, id: Uuid) -> Result<()> {
        const ACTION: &str = "刪除商品";
        require_admin(&self.session, ACTION)?;

        self.commit(ACTION, |store| store.delete_product(id))?;
        self.invalidate(&[keys::all_products(), keys::one_product(id)]);
        Ok(())
    }

    /// 更新訂單部分欄位
    pub fn update_order(&mut self, id: Uuid, patch: Patch<OrderField>) -> Result<Order> {
        const ACTION: &str = "更新訂單";
        require_admin(&self.session, ACTION)?;
        shop_core::order::validate_order_patch(&patch)?;

        let order = self.commit(ACTION, |store| store.update_order(id, &patch))?;
        self.invalidate(&[keys::all_orders(), keys::one_order(order.id)]);
        Ok(order)
    }

    /// 儲存商品編輯；成功後追蹤器以回傳的記錄為新基準
    pub fn save_product_edits(
        &mut self,
        id: Uuid,
        tracker: &mut DirtyTracker<ProductField>,
    ) -> Result<SaveOutcome<Product>> {
        let Some(patch) = tracker.changes() else {
            return Ok(SaveOutcome::NothingToSave);
        };
        let product = self.update_product(id, patch)?;
        tracker.reset_record(Some(&product));
        Ok(SaveOutcome::Saved(product))
    }

    /// 儲存訂單編輯；成功後追蹤器以回傳的記錄為新基準
    pub fn save_order_edits(
        &mut self,
        id: Uuid,
        tracker: &mut DirtyTracker<OrderField>,
    ) -> Result<SaveOutcome<Order>> {
        let Some(patch) = tracker.changes() else {
            return Ok(SaveOutcome::NothingToSave);
        };
        let order = self.update_order(id, patch)?;
        tracker.reset_record(Some(&order));
        Ok(SaveOutcome::Saved(order))
    }

    fn commit<T>(&mut self, action: &str, request: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        match request(&mut self.store) {
            Ok(value) => {
                info!("{}成功", action);
                Ok(value)
            }
            Err(err) => {
                warn!("{}失敗: {}", action, err);
                Err(err)
            }
        }
    }

    /// 失效並立即重新抓取有觀察者的查詢；回傳重新抓取的查詢鍵
    fn invalidate(&mut self, filters: &[QueryFilter]) -> Vec<QueryKey> {
        let mut eager: Vec<QueryKey> = filters
            .iter()
            .flat_map(|filter| self.cache.invalidate(filter))
            .collect();
        eager.sort();
        eager.dedup();

        for key in &eager {
            let ticket = self.cache.begin_fetch(key, None);
            if let FetchOutcome::Failed(err) = self.finish_load(ticket) {
                warn!("重新抓取 {} 失敗: {}", key, err);
            }
        }
        eager
    }
}

fn fetch_source<S: RecordStore>(
    store: &S,
    sources: &HashMap<QueryKey, QuerySource>,
    key: &QueryKey,
) -> Result<QueryData> {
    let source = sources
        .get(key)
        .ok_or_else(|| AdminError::Config(format!("未登記的查詢 {}", key)))?;

    match source {
        QuerySource::Products(query) => store.list_products(query).map(QueryData::Products),
        QuerySource::Product(id) => store.get_product(*id).map(QueryData::Product),
        QuerySource::Orders(query) => store.list_orders(query).map(QueryData::Orders),
        QuerySource::Order(id) => store.get_order(*id).map(QueryData::Order),
        QuerySource::Brands => store.list_brands().map(QueryData::Brands),
    }
}
