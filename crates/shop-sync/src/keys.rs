//! 查詢鍵目錄
//!
//! 每個可觀察的查詢都由 [`QuerySource`] 描述，並對應一個正規化的查詢鍵：
//!
//! | 資源 | 參數 |
//! |------|------|
//! | `products` | `brands`, `page`, `page_size`, `sort_by`, `stock_status` |
//! | `product` | `id` |
//! | `orders` | `page`, `page_size`, `search`, `status` |
//! | `order` | `id` |
//! | `brands` | 無 |

use shop_cache::{KeyPart, QueryFilter, QueryKey};
use uuid::Uuid;

use crate::store::{OrderQuery, ProductQuery};

pub const PRODUCTS: &str = "products";
pub const PRODUCT: &str = "product";
pub const ORDERS: &str = "orders";
pub const ORDER: &str = "order";
pub const BRANDS: &str = "brands";

/// 篩選值為「全部」時的鍵值
const ALL: &str = "All";

/// 查詢來源
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuerySource {
    Products(ProductQuery),
    Product(Uuid),
    Orders(OrderQuery),
    Order(Uuid),
    Brands,
}

impl QuerySource {
    /// 對應的正規化查詢鍵
    pub fn key(&self) -> QueryKey {
        match self {
            QuerySource::Products(query) => products_key(query),
            QuerySource::Product(id) => product_key(*id),
            QuerySource::Orders(query) => orders_key(query),
            QuerySource::Order(id) => order_key(*id),
            QuerySource::Brands => brands_key(),
        }
    }

    /// 去掉不影響查詢鍵的差異（搜尋字串前後空白），使同鍵的來源一致
    pub fn normalized(self) -> Self {
        match self {
            QuerySource::Orders(mut query) => {
                query.search = query.search.trim().to_string();
                QuerySource::Orders(query)
            }
            other => other,
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            QuerySource::Products(_) => PRODUCTS,
            QuerySource::Product(_) => PRODUCT,
            QuerySource::Orders(_) => ORDERS,
            QuerySource::Order(_) => ORDER,
            QuerySource::Brands => BRANDS,
        }
    }
}

pub fn products_key(query: &ProductQuery) -> QueryKey {
    let status = query
        .stock_status
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| ALL.to_string());

    QueryKey::new(PRODUCTS)
        .with("brands", KeyPart::set(query.brands.iter().cloned().map(KeyPart::from)))
        .with("page", query.pagination.page)
        .with("page_size", query.pagination.page_size)
        .with_opt("sort_by", query.sort_by.map(|s| s.as_str()))
        .with("stock_status", status)
}

pub fn product_key(id: Uuid) -> QueryKey {
    QueryKey::new(PRODUCT).with("id", id.to_string())
}

pub fn orders_key(query: &OrderQuery) -> QueryKey {
    let status = query
        .status
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| ALL.to_string());

    QueryKey::new(ORDERS)
        .with("page", query.pagination.page)
        .with("page_size", query.pagination.page_size)
        .with("search", query.search.trim())
        .with("status", status)
}

pub fn order_key(id: Uuid) -> QueryKey {
    QueryKey::new(ORDER).with("id", id.to_string())
}

pub fn brands_key() -> QueryKey {
    QueryKey::new(BRANDS)
}

/// 所有商品列表（不論篩選條件）
pub fn all_products() -> QueryFilter {
    QueryFilter::resource(PRODUCTS)
}

/// 所有訂單列表
pub fn all_orders() -> QueryFilter {
    QueryFilter::resource(ORDERS)
}

pub fn one_product(id: Uuid) -> QueryFilter {
    QueryFilter::Exact(product_key(id))
}

pub fn one_order(id: Uuid) -> QueryFilter {
    QueryFilter::Exact(order_key(id))
}
