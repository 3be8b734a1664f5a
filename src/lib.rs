//! # Shop Admin
//!
//! 商店後台的資料層：
//! - [`model`]：資料模型、驗證與配置
//! - [`cache`]：髒欄位追蹤與查詢快取
//! - [`sync`]：儲存介面與寫入後的快取同步

pub use shop_cache as cache;
pub use shop_core as model;
pub use shop_sync as sync;

pub use shop_cache::{DirtyTracker, QueryClient, QueryKey, QueryState};
pub use shop_core::{AdminConfig, AdminError, Order, OrderField, Patch, Product, ProductField, Result};
pub use shop_sync::{AdminClient, QueryData, QuerySource, SaveOutcome};
