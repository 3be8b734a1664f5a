//! 訂單模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{FieldName, Patch, Record};
use crate::validation::ValidationErrors;
use crate::value::FieldValue;
use crate::{AdminError, Result};

/// 訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

/// 訂單明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub size: String,
    pub color: Option<String>,
    pub product_price: Decimal,
    pub product_title: String,
    pub product_image: String,
}

impl OrderItem {
    /// 小計
    pub fn line_total(&self) -> Decimal {
        self.product_price * Decimal::from(self.quantity)
    }
}

/// 訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// 創建新的訂單（待處理）
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            email: email.into(),
            address: String::new(),
            city: String::new(),
            postal_code: String::new(),
            phone: String::new(),
            notes: None,
            status: OrderStatus::Pending,
            items: Vec::new(),
            total: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置地址
    pub fn with_address(
        mut self,
        address: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        self.address = address.into();
        self.city = city.into();
        self.postal_code = postal_code.into();
        self
    }

    /// 建構器模式：設置電話
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// 建構器模式：設置狀態
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// 建構器模式：設置建立時間
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// 添加明細並更新總額
    pub fn add_item(&mut self, item: OrderItem) {
        self.total += item.line_total();
        self.items.push(item);
    }

    /// 姓名或電子郵件是否包含關鍵字（不分大小寫）
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.full_name.to_lowercase().contains(&needle) || self.email.to_lowercase().contains(&needle)
    }
}

/// 訂單可編輯欄位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderField {
    FullName,
    Email,
    Phone,
    Status,
    Address,
    City,
    PostalCode,
    Notes,
}

impl FieldName for OrderField {
    const ALL: &'static [Self] = &[
        OrderField::FullName,
        OrderField::Email,
        OrderField::Phone,
        OrderField::Status,
        OrderField::Address,
        OrderField::City,
        OrderField::PostalCode,
        OrderField::Notes,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            OrderField::FullName => "full_name",
            OrderField::Email => "email",
            OrderField::Phone => "phone",
            OrderField::Status => "status",
            OrderField::Address => "address",
            OrderField::City => "city",
            OrderField::PostalCode => "postal_code",
            OrderField::Notes => "notes",
        }
    }
}

impl Record for Order {
    type Field = OrderField;

    fn field(&self, field: OrderField) -> FieldValue {
        match field {
            OrderField::FullName => FieldValue::from(self.full_name.as_str()),
            OrderField::Email => FieldValue::from(self.email.as_str()),
            OrderField::Phone => FieldValue::from(self.phone.as_str()),
            OrderField::Status => FieldValue::from(self.status.label()),
            OrderField::Address => FieldValue::from(self.address.as_str()),
            OrderField::City => FieldValue::from(self.city.as_str()),
            OrderField::PostalCode => FieldValue::from(self.postal_code.as_str()),
            OrderField::Notes => FieldValue::from(self.notes.clone()),
        }
    }

    fn set_field(&mut self, field: OrderField, value: &FieldValue) -> Result<()> {
        if field == OrderField::Notes {
            self.notes = match value {
                FieldValue::Null => None,
                FieldValue::Text(s) => Some(s.clone()),
                other => {
                    return Err(AdminError::invalid_field(
                        "notes",
                        format!("expected string, got {}", other.kind()),
                    ))
                }
            };
            return Ok(());
        }

        let text = value.as_text().ok_or_else(|| {
            AdminError::invalid_field(
                field.as_str(),
                format!("expected string, got {}", value.kind()),
            )
        })?;

        match field {
            OrderField::FullName => self.full_name = text.to_string(),
            OrderField::Email => self.email = text.to_string(),
            OrderField::Phone => self.phone = text.to_string(),
            OrderField::Status => {
                self.status = OrderStatus::from_label(text).ok_or_else(|| {
                    AdminError::invalid_field("status", format!("unknown order status '{}'", text))
                })?;
            }
            OrderField::Address => self.address = text.to_string(),
            OrderField::City => self.city = text.to_string(),
            OrderField::PostalCode => self.postal_code = text.to_string(),
            OrderField::Notes => unreachable!("notes handled above"),
        }
        Ok(())
    }
}

/// 驗證訂單補丁中出現的欄位
pub fn validate_order_patch(patch: &Patch<OrderField>) -> Result<()> {
    let mut errors = ValidationErrors::new();

    for (field, value) in patch.iter() {
        let name = field.as_str();
        match (field, value) {
            (OrderField::Notes, FieldValue::Null | FieldValue::Text(_)) => {}
            (OrderField::FullName, FieldValue::Text(s)) => {
                errors.check(!s.trim().is_empty(), name, "Name cannot be empty")
            }
            (OrderField::Email, FieldValue::Text(s)) => {
                errors.check(s.contains('@'), name, "Email must be a valid address")
            }
            (OrderField::Status, FieldValue::Text(s)) => errors.check(
                OrderStatus::from_label(s).is_some(),
                name,
                "Unknown order status",
            ),
            (_, FieldValue::Text(_)) => {}
            (_, other) => errors.push(name, format!("unexpected {} value", other.kind())),
        }
    }

    errors.into_result()
}
