//! # Shop Core
//!
//! 核心資料模型與類型定義

pub mod config;
pub mod order;
pub mod product;
pub mod profile;
pub mod record;
pub mod validation;
pub mod value;

// Re-export 主要類型
pub use config::{AdminConfig, DEFAULT_LOW_STOCK_THRESHOLD};
pub use order::{Order, OrderField, OrderItem, OrderStatus};
pub use product::{Brand, NewProduct, Product, ProductField, StockStatus};
pub use profile::Profile;
pub use record::{FieldName, Patch, Record, Snapshot};
pub use validation::{FieldViolation, ValidationErrors};
pub use value::FieldValue;

/// 後台錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdminError {
    #[error("資料驗證失敗: {0}")]
    Validation(ValidationErrors),

    #[error("權限不足: {0}")]
    Authorization(String),

    #[error("傳輸錯誤: {0}")]
    Transport(String),

    #[error("找不到 {resource}: {id}")]
    NotFound { resource: String, id: String },

    #[error("配置錯誤: {0}")]
    Config(String),
}

impl AdminError {
    /// 建立找不到資源的錯誤
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// 建立單一欄位的驗證錯誤
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    /// 是否可重試（僅傳輸錯誤）
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// 是否為找不到資源
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;
