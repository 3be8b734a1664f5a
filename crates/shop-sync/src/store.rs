//! 記錄儲存介面
//!
//! 託管資料庫的抽象。核心只呼叫這些操作，不實作資料庫本身。

use serde::{Deserialize, Serialize};
use shop_core::{
    Brand, NewProduct, Order, OrderField, OrderStatus, Patch, Product, ProductField, Result,
    StockStatus,
};
use uuid::Uuid;

/// 分頁（頁碼由 1 開始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// 起始位置（含）
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }

    /// 取出本頁項目
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset())
            .take(self.page_size as usize)
            .cloned()
            .collect()
    }
}

/// 列表結果與總筆數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListPage<T> {
    pub fn new(items: Vec<T>, total: usize) -> Self {
        Self { items, total }
    }

    /// 總頁數
    pub fn page_count(&self, page_size: u32) -> usize {
        let size = page_size.max(1) as usize;
        (self.total + size - 1) / size
    }
}

/// 商品排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductSort {
    Newest,
    PriceAsc,
    PriceDesc,
    Title,
}

impl ProductSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSort::Newest => "newest",
            ProductSort::PriceAsc => "price-asc",
            ProductSort::PriceDesc => "price-desc",
            ProductSort::Title => "title",
        }
    }
}

/// 商品列表篩選
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductQuery {
    /// 品牌名稱（空表示全部）
    pub brands: Vec<String>,
    pub sort_by: Option<ProductSort>,
    pub pagination: Pagination,
    /// None 表示全部（"All"）
    pub stock_status: Option<StockStatus>,
}

impl ProductQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            brands: Vec::new(),
            sort_by: None,
            pagination: Pagination::new(page, page_size),
            stock_status: None,
        }
    }

    /// 建構器模式：設置品牌篩選
    pub fn with_brands(mut self, brands: Vec<String>) -> Self {
        self.brands = brands;
        self
    }

    /// 建構器模式：設置排序
    pub fn with_sort(mut self, sort: ProductSort) -> Self {
        self.sort_by = Some(sort);
        self
    }

    /// 建構器模式：設置庫存狀態篩選
    pub fn with_stock_status(mut self, status: StockStatus) -> Self {
        self.stock_status = Some(status);
        self
    }

    /// 換頁
    pub fn page(mut self, page: u32) -> Self {
        self.pagination = Pagination::new(page, self.pagination.page_size);
        self
    }
}

/// 訂單列表篩選
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderQuery {
    pub pagination: Pagination,
    /// None 表示全部（"All"）
    pub status: Option<OrderStatus>,
    /// 比對姓名或電子郵件（不分大小寫）；空字串表示不篩選
    pub search: String,
}

impl OrderQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            pagination: Pagination::new(page, page_size),
            status: None,
            search: String::new(),
        }
    }

    /// 建構器模式：設置狀態篩選
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// 建構器模式：設置搜尋字串（去掉前後空白）
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into().trim().to_string();
        self
    }

    /// 換頁
    pub fn page(mut self, page: u32) -> Self {
        self.pagination = Pagination::new(page, self.pagination.page_size);
        self
    }
}

/// 記錄儲存
///
/// 每次呼叫代表一個請求，可能以傳輸、驗證或找不到資源的錯誤失敗。
pub trait RecordStore {
    fn list_products(&self, query: &ProductQuery) -> Result<ListPage<Product>>;

    fn get_product(&self, id: Uuid) -> Result<Option<Product>>;

    fn insert_product(&mut self, payload: NewProduct) -> Result<Product>;

    fn update_product(&mut self, id: Uuid, patch: &Patch<ProductField>) -> Result<Product>;

    fn delete_product(&mut self, id: Uuid) -> Result<()>;

    fn list_orders(&self, query: &OrderQuery) -> Result<ListPage<Order>>;

    fn get_order(&self, id: Uuid) -> Result<Option<Order>>;

    fn update_order(&mut self, id: Uuid, patch: &Patch<OrderField>) -> Result<Order>;

    /// 品牌列表（依名稱排序）
    fn list_brands(&self) -> Result<Vec<Brand>>;
}
