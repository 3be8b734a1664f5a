//! 商品與品牌模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{FieldName, Patch, Record};
use crate::validation::{min_chars, ValidationErrors};
use crate::value::FieldValue;
use crate::{AdminError, Result};

/// 品牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
}

impl Brand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// 庫存狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "In stock")]
    InStock,
    #[serde(rename = "Low stock")]
    LowStock,
    #[serde(rename = "Out of stock")]
    OutOfStock,
}

impl StockStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In stock",
            StockStatus::LowStock => "Low stock",
            StockStatus::OutOfStock => "Out of stock",
        }
    }

    /// 由庫存數量推算狀態
    pub fn from_stock(stock: i64, low_stock_threshold: i64) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// 商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub on_sale: bool,
    /// 所屬品牌（可能尚未指定）
    pub brand: Option<Brand>,
    /// 已儲存的圖片路徑或外部 URL
    pub images: Vec<String>,
    pub description: String,
    pub sizes: Vec<String>,
    pub stock: i64,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// 創建新的商品
    pub fn new(title: impl Into<String>, price: Decimal, stock: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            price,
            original_price: None,
            on_sale: false,
            brand: None,
            images: Vec::new(),
            description: String::new(),
            sizes: Vec::new(),
            stock,
            stock_status: StockStatus::from_stock(stock, crate::config::DEFAULT_LOW_STOCK_THRESHOLD),
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置品牌
    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brand = Some(brand);
        self
    }

    /// 建構器模式：設置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 建構器模式：設置圖片
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// 建構器模式：設置尺寸
    pub fn with_sizes(mut self, sizes: Vec<String>) -> Self {
        self.sizes = sizes;
        self
    }

    /// 建構器模式：設置特價
    pub fn with_sale(mut self, original_price: Decimal) -> Self {
        self.original_price = Some(original_price);
        self.on_sale = true;
        self
    }

    /// 建構器模式：設置建立時間
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// 依庫存重新計算狀態
    pub fn refresh_stock_status(&mut self, low_stock_threshold: i64) {
        self.stock_status = StockStatus::from_stock(self.stock, low_stock_threshold);
    }

    pub fn brand_name(&self) -> &str {
        self.brand.as_ref().map(|b| b.name.as_str()).unwrap_or("")
    }
}

/// 商品可編輯欄位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductField {
    Title,
    Price,
    OriginalPrice,
    OnSale,
    BrandId,
    Description,
    Stock,
    Sizes,
    Images,
}

impl FieldName for ProductField {
    const ALL: &'static [Self] = &[
        ProductField::Title,
        ProductField::Price,
        ProductField::OriginalPrice,
        ProductField::OnSale,
        ProductField::BrandId,
        ProductField::Description,
        ProductField::Stock,
        ProductField::Sizes,
        ProductField::Images,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ProductField::Title => "title",
            ProductField::Price => "price",
            ProductField::OriginalPrice => "originalPrice",
            ProductField::OnSale => "onSale",
            ProductField::BrandId => "brand_id",
            ProductField::Description => "description",
            ProductField::Stock => "stock",
            ProductField::Sizes => "sizes",
            ProductField::Images => "images",
        }
    }
}

fn type_mismatch(field: ProductField, expected: &str, got: &FieldValue) -> AdminError {
    AdminError::invalid_field(
        field.as_str(),
        format!("expected {}, got {}", expected, got.kind()),
    )
}

/// 整數且落在 i64 範圍內（`i64::MAX as f64` 為 2^63，不在範圍內）
fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    if value.is_finite() && value.fract() == 0.0 && in_range {
        Some(value as i64)
    } else {
        None
    }
}

impl Record for Product {
    type Field = ProductField;

    fn field(&self, field: ProductField) -> FieldValue {
        match field {
            ProductField::Title => FieldValue::from(self.title.as_str()),
            ProductField::Price => FieldValue::from_decimal(self.price),
            ProductField::OriginalPrice => self
                .original_price
                .map(FieldValue::from_decimal)
                .unwrap_or(FieldValue::Null),
            ProductField::OnSale => FieldValue::Bool(self.on_sale),
            ProductField::BrandId => self
                .brand
                .as_ref()
                .map(|b| FieldValue::Text(b.id.to_string()))
                .unwrap_or(FieldValue::Null),
            ProductField::Description => FieldValue::from(self.description.as_str()),
            ProductField::Stock => FieldValue::from(self.stock),
            ProductField::Sizes => FieldValue::TextList(self.sizes.clone()),
            ProductField::Images => FieldValue::TextList(self.images.clone()),
        }
    }

    fn set_field(&mut self, field: ProductField, value: &FieldValue) -> Result<()> {
        match (field, value) {
            (ProductField::Title, FieldValue::Text(s)) => self.title = s.clone(),
            (ProductField::Price, FieldValue::Number(_)) => {
                self.price = value
                    .to_decimal()
                    .ok_or_else(|| AdminError::invalid_field("price", "Price is required"))?;
            }
            (ProductField::OriginalPrice, FieldValue::Null) => self.original_price = None,
            (ProductField::OriginalPrice, FieldValue::Number(_)) => {
                let price = value.to_decimal().ok_or_else(|| {
                    AdminError::invalid_field("originalPrice", "Original price must be a number")
                })?;
                self.original_price = Some(price);
            }
            (ProductField::OnSale, FieldValue::Bool(b)) => self.on_sale = *b,
            (ProductField::BrandId, FieldValue::Null) => self.brand = None,
            (ProductField::BrandId, FieldValue::Text(s)) => {
                let id = Uuid::parse_str(s).map_err(|_| {
                    AdminError::invalid_field("brand_id", "Brand id must be a valid UUID")
                })?;
                if self.brand.as_ref().map(|b| b.id) != Some(id) {
                    // 名稱由記錄儲存依品牌表補齊
                    self.brand = Some(Brand {
                        id,
                        name: String::new(),
                    });
                }
            }
            (ProductField::Description, FieldValue::Text(s)) => self.description = s.clone(),
            (ProductField::Stock, FieldValue::Number(n)) => {
                self.stock = integral(*n).ok_or_else(|| {
                    AdminError::invalid_field("stock", "Stock must be an integer")
                })?;
            }
            (ProductField::Sizes, FieldValue::TextList(items)) => self.sizes = items.clone(),
            (ProductField::Images, FieldValue::TextList(items)) => self.images = items.clone(),
            (ProductField::Title | ProductField::Description | ProductField::BrandId, other) => {
                return Err(type_mismatch(field, "string", other))
            }
            (ProductField::Price | ProductField::OriginalPrice | ProductField::Stock, other) => {
                return Err(type_mismatch(field, "number", other))
            }
            (ProductField::OnSale, other) => return Err(type_mismatch(field, "boolean", other)),
            (ProductField::Sizes | ProductField::Images, other) => {
                return Err(type_mismatch(field, "string[]", other))
            }
        }
        Ok(())
    }
}

/// 建立商品的請求內容（表單輸入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    /// 表單數值；空白輸入為 NaN
    pub price: f64,
    pub original_price: Option<f64>,
    pub on_sale: bool,
    pub brand_id: Option<Uuid>,
    /// 沒有品牌 ID 時依名稱建立或沿用品牌
    pub brand_name: Option<String>,
    pub images: Vec<String>,
    pub description: String,
    pub sizes: Vec<String>,
    pub stock: f64,
}

impl NewProduct {
    pub fn new(title: impl Into<String>, price: f64, stock: f64) -> Self {
        Self {
            title: title.into(),
            price,
            original_price: None,
            on_sale: false,
            brand_id: None,
            brand_name: None,
            images: Vec::new(),
            description: String::new(),
            sizes: Vec::new(),
            stock,
        }
    }

    /// 建構器模式：設置品牌 ID
    pub fn with_brand_id(mut self, brand_id: Uuid) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    /// 建構器模式：設置品牌名稱
    pub fn with_brand_name(mut self, name: impl Into<String>) -> Self {
        self.brand_name = Some(name.into());
        self
    }

    /// 建構器模式：設置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 建構器模式：設置圖片
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// 建構器模式：設置尺寸
    pub fn with_sizes(mut self, sizes: Vec<String>) -> Self {
        self.sizes = sizes;
        self
    }

    /// 建構器模式：設置特價
    pub fn with_sale(mut self, original_price: f64) -> Self {
        self.original_price = Some(original_price);
        self.on_sale = true;
        self
    }

    /// 驗證所有欄位，收集全部違規
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();

        errors.check(min_chars(&self.title, 3), "title", "Title must be at least 3 characters");
        check_price(&mut errors, "price", self.price, "Price is required", "Price must be positive");
        if let Some(original) = self.original_price {
            check_price(
                &mut errors,
                "originalPrice",
                original,
                "Original price must be a number",
                "Original price must be positive",
            );
        }
        errors.check(
            min_chars(&self.description, 5),
            "description",
            "Description must be at least 5 characters",
        );
        check_stock(&mut errors, self.stock);
        check_text_list(&mut errors, "sizes", &self.sizes, "Size cannot be empty");

        match (&self.brand_id, &self.brand_name) {
            (None, None) => errors.push("brands", "Brand is required"),
            (_, Some(name)) => errors.check(
                min_chars(name, 2),
                "brands",
                "Brand name must be at least 2 characters",
            ),
            _ => {}
        }

        errors.check(!self.images.is_empty(), "images", "At least one image is required");
        check_text_list(&mut errors, "images", &self.images, "Each image must be a non-empty string");

        errors.into_result()
    }

    /// 轉為商品記錄（價格須已驗證）
    pub fn into_product(self, brand: Option<Brand>, low_stock_threshold: i64) -> Result<Product> {
        let price = FieldValue::Number(self.price)
            .to_decimal()
            .ok_or_else(|| AdminError::invalid_field("price", "Price is required"))?;
        let original_price = match self.original_price {
            Some(p) => Some(FieldValue::Number(p).to_decimal().ok_or_else(|| {
                AdminError::invalid_field("originalPrice", "Original price must be a number")
            })?),
            None => None,
        };
        let stock = integral(self.stock)
            .ok_or_else(|| AdminError::invalid_field("stock", "Stock must be an integer"))?;

        Ok(Product {
            id: Uuid::new_v4(),
            title: self.title,
            price,
            original_price,
            on_sale: self.on_sale,
            brand,
            images: self.images,
            description: self.description,
            sizes: self.sizes,
            stock,
            stock_status: StockStatus::from_stock(stock, low_stock_threshold),
            created_at: Utc::now(),
        })
    }
}

fn check_price(errors: &mut ValidationErrors, field: &str, value: f64, missing: &str, negative: &str) {
    if !value.is_finite() {
        errors.push(field, missing);
    } else if value < 0.0 {
        errors.push(field, negative);
    }
}

fn check_stock(errors: &mut ValidationErrors, value: f64) {
    if integral(value).is_none() {
        errors.push("stock", "Stock must be an integer");
    } else if value < 0.0 {
        errors.push("stock", "Stock cannot be negative");
    }
}

fn check_text_list(errors: &mut ValidationErrors, field: &str, items: &[String], message: &str) {
    if items.iter().any(|s| s.trim().is_empty()) {
        errors.push(field, message);
    }
}

/// 驗證商品補丁中出現的欄位
pub fn validate_product_patch(patch: &Patch<ProductField>) -> Result<()> {
    let mut errors = ValidationErrors::new();

    for (field, value) in patch.iter() {
        let name = field.as_str();
        match (field, value) {
            (ProductField::Title, FieldValue::Text(s)) => {
                errors.check(min_chars(s, 3), name, "Title must be at least 3 characters")
            }
            (ProductField::Description, FieldValue::Text(s)) => {
                errors.check(min_chars(s, 5), name, "Description must be at least 5 characters")
            }
            (ProductField::Price, FieldValue::Number(n)) => {
                check_price(&mut errors, name, *n, "Price is required", "Price must be positive")
            }
            (ProductField::OriginalPrice, FieldValue::Number(n)) => check_price(
                &mut errors,
                name,
                *n,
                "Original price must be a number",
                "Original price must be positive",
            ),
            (ProductField::OriginalPrice, FieldValue::Null) => {}
            (ProductField::OnSale, FieldValue::Bool(_)) => {}
            (ProductField::BrandId, FieldValue::Text(s)) => errors.check(
                Uuid::parse_str(s).is_ok(),
                name,
                "Brand id must be a valid UUID",
            ),
            (ProductField::BrandId, FieldValue::Null) => {}
            (ProductField::Stock, FieldValue::Number(n)) => check_stock(&mut errors, *n),
            (ProductField::Sizes, FieldValue::TextList(items)) => {
                check_text_list(&mut errors, name, items, "Size cannot be empty")
            }
            (ProductField::Images, FieldValue::TextList(items)) => {
                errors.check(!items.is_empty(), name, "At least one image is required");
                check_text_list(&mut errors, name, items, "Each image must be a non-empty string");
            }
            (_, other) => errors.push(name, format!("unexpected {} value", other.kind())),
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid_payload() -> NewProduct {
        NewProduct::new("Linen Shirt", 49.9, 12.0)
            .with_brand_name("Acme")
            .with_description("Relaxed fit linen shirt")
            .with_images(vec!["products-images/acme/1.png".to_string()])
            .with_sizes(vec!["S".to_string(), "M".to_string()])
    }

    #[rstest]
    #[case(0, StockStatus::OutOfStock)]
    #[case(-3, StockStatus::OutOfStock)]
    #[case(1, StockStatus::LowStock)]
    #[case(10, StockStatus::LowStock)]
    #[case(11, StockStatus::InStock)]
    fn test_stock_status_from_stock(#[case] stock: i64, #[case] expected: StockStatus) {
        assert_eq!(StockStatus::from_stock(stock, 10), expected);
    }

    #[test]
    fn test_valid_payload() {
        assert!(valid_payload().validate().is_ok());
    }

    #[test]
    fn test_payload_collects_all_violations() {
        let payload = NewProduct::new("ab", f64::NAN, 1.5);
        let err = payload.validate().unwrap_err();

        let AdminError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.has_field("title"));
        assert!(errors.has_field("price"));
        assert!(errors.has_field("stock"));
        assert!(errors.has_field("description"));
        assert!(errors.has_field("brands"));
        assert!(errors.has_field("images"));
    }

    #[test]
    fn test_into_product() {
        let brand = Brand::new("Acme");
        let product = valid_payload().into_product(Some(brand.clone()), 10).unwrap();

        assert_eq!(product.price, Decimal::new(499, 1));
        assert_eq!(product.stock, 12);
        assert_eq!(product.stock_status, StockStatus::InStock);
        assert_eq!(product.brand, Some(brand));
    }

    #[test]
    fn test_snapshot_and_apply_patch() {
        let mut product = Product::new("Linen Shirt", Decimal::from(40), 3);
        let snapshot = product.snapshot();
        assert_eq!(snapshot.len(), ProductField::ALL.len());
        assert_eq!(snapshot[&ProductField::Price], FieldValue::Number(40.0));
        assert_eq!(snapshot[&ProductField::BrandId], FieldValue::Null);

        let patch = Patch::single(ProductField::Price, 20.0).with(ProductField::Stock, 0.0);
        product.apply_patch(&patch).unwrap();
        assert_eq!(product.price, Decimal::from(20));
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn test_apply_patch_is_all_or_nothing() {
        let mut product = Product::new("Linen Shirt", Decimal::from(40), 3);
        let before = product.clone();

        let patch = Patch::single(ProductField::Title, "Wool Shirt")
            .with(ProductField::Price, f64::NAN);
        assert!(product.apply_patch(&patch).is_err());
        assert_eq!(product, before);
    }

    #[test]
    fn test_validate_product_patch() {
        let ok = Patch::single(ProductField::Stock, 4.0);
        assert!(validate_product_patch(&ok).is_ok());

        let bad = Patch::single(ProductField::Images, Vec::<String>::new())
            .with(ProductField::BrandId, "not-a-uuid");
        let err = validate_product_patch(&bad).unwrap_err();
        assert!(matches!(err, AdminError::Validation(ref e) if e.len() == 2));
    }

    #[rstest]
    #[case(1e20)]
    #[case(9.3e18)]
    #[case(-1e20)]
    fn test_stock_outside_integer_range_is_rejected(#[case] stock: f64) {
        let patch = Patch::single(ProductField::Stock, stock);
        assert!(matches!(validate_product_patch(&patch), Err(AdminError::Validation(_))));

        let mut payload = valid_payload();
        payload.stock = stock;
        assert!(payload.validate().is_err());
    }
}
