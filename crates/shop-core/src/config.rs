//! 後台配置模型

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{AdminError, Result};

/// 預設低庫存門檻
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// 後台配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// 商品列表與單一商品的新鮮期（秒）
    pub product_stale_secs: u64,

    /// 訂單列表的新鮮期（秒）
    pub order_stale_secs: u64,

    /// 品牌列表的新鮮期（秒）；品牌很少變動
    pub brand_stale_secs: u64,

    /// 無觀察者的快取項目保留時間（秒）
    pub gc_secs: u64,

    /// 商品列表每頁筆數
    pub product_page_size: u32,

    /// 訂單列表每頁筆數
    pub order_page_size: u32,

    /// 低庫存門檻（庫存 ≤ 門檻視為低庫存）
    pub low_stock_threshold: i64,

    /// 圖片儲存桶
    pub image_bucket: String,

    /// 公開儲存 URL 前綴（例如 `https://<project>.supabase.co/storage/v1/object/public/`）
    pub public_storage_url: Option<String>,

    /// 搜尋輸入防抖延遲（毫秒）
    pub search_debounce_ms: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            product_stale_secs: 5 * 60,
            order_stale_secs: 2 * 60,
            brand_stale_secs: 30 * 60,
            gc_secs: 60 * 60,
            product_page_size: 6,
            order_page_size: 10,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            image_bucket: "products-images".to_string(),
            public_storage_url: None,
            search_debounce_ms: 300,
        }
    }
}

impl AdminConfig {
    /// 從 JSON 字串載入；缺少的欄位使用預設值
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AdminError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 從 JSON 檔案載入
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AdminError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    /// 檢查配置是否合理
    pub fn validate(&self) -> Result<()> {
        if self.product_page_size == 0 || self.order_page_size == 0 {
            return Err(AdminError::Config("每頁筆數必須大於 0".to_string()));
        }
        if self.image_bucket.trim().is_empty() {
            return Err(AdminError::Config("圖片儲存桶名稱不可為空".to_string()));
        }
        Ok(())
    }

    /// 建構器模式：設置商品新鮮期
    pub fn with_product_stale_secs(mut self, secs: u64) -> Self {
        self.product_stale_secs = secs;
        self
    }

    /// 建構器模式：設置訂單新鮮期
    pub fn with_order_stale_secs(mut self, secs: u64) -> Self {
        self.order_stale_secs = secs;
        self
    }

    /// 建構器模式：設置低庫存門檻
    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    /// 建構器模式：設置公開儲存 URL 前綴
    pub fn with_public_storage_url(mut self, url: impl Into<String>) -> Self {
        self.public_storage_url = Some(url.into());
        self
    }

    /// 建構器模式：設置商品每頁筆數
    pub fn with_product_page_size(mut self, size: u32) -> Self {
        self.product_page_size = size;
        self
    }

    /// 依資源名稱取得新鮮期
    pub fn stale_time_for(&self, resource: &str) -> Duration {
        let secs = match resource {
            "orders" | "order" => self.order_stale_secs,
            "brands" => self.brand_stale_secs,
            _ => self.product_stale_secs,
        };
        Duration::seconds(secs as i64)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::seconds(self.gc_secs as i64)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::milliseconds(self.search_debounce_ms as i64)
    }
}
