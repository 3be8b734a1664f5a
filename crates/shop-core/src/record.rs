//! 記錄與欄位抽象
//!
//! 每種記錄在編譯期宣告固定的欄位集合（欄位列舉），追蹤器與補丁
//! 都以欄位列舉為參數，不依賴任意字串鍵。

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::value::FieldValue;

/// 靜態宣告的欄位名稱
pub trait FieldName: Copy + Ord + Hash + Debug + 'static {
    /// 全部欄位（固定順序）
    const ALL: &'static [Self];

    /// 資料庫欄位名稱
    fn as_str(&self) -> &'static str;

    /// 由欄位名稱解析
    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

/// 欄位快照（欄位 → 值）
pub type Snapshot<F> = BTreeMap<F, FieldValue>;

/// 可被編輯追蹤的記錄
pub trait Record {
    type Field: FieldName;

    /// 取得單一欄位值
    fn field(&self, field: Self::Field) -> FieldValue;

    /// 套用單一欄位值；類型不符時回傳驗證錯誤
    fn set_field(&mut self, field: Self::Field, value: &FieldValue) -> crate::Result<()>;

    /// 所有欄位的快照
    fn snapshot(&self) -> Snapshot<Self::Field> {
        Self::Field::ALL
            .iter()
            .map(|&f| (f, self.field(f)))
            .collect()
    }

    /// 套用補丁（先在副本上套用，全部成功才寫回）
    fn apply_patch(&mut self, patch: &Patch<Self::Field>) -> crate::Result<()>
    where
        Self: Clone,
    {
        let mut next = self.clone();
        for (field, value) in patch.iter() {
            next.set_field(field, value)?;
        }
        *self = next;
        Ok(())
    }
}

/// 只包含已變更欄位的補丁
#[derive(Debug, Clone, PartialEq)]
pub struct Patch<F: FieldName> {
    fields: BTreeMap<F, FieldValue>,
}

impl<F: FieldName> Patch<F> {
    /// 由欄位映射建立補丁；空映射回傳 None
    pub fn from_map(fields: BTreeMap<F, FieldValue>) -> Option<Self> {
        if fields.is_empty() {
            None
        } else {
            Some(Self { fields })
        }
    }

    /// 單欄位補丁
    pub fn single(field: F, value: impl Into<FieldValue>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field, value.into());
        Self { fields }
    }

    /// 建構器模式：追加欄位
    pub fn with(mut self, field: F, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn get(&self, field: F) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: F) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &FieldValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.keys().map(|f| f.as_str()).collect()
    }

    /// 轉為 JSON 物件（送往記錄儲存的請求主體）
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(f, v)| {
                let json = serde_json::to_value(v).unwrap_or(serde_json::Value::Null);
                (f.as_str().to_string(), json)
            })
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn into_map(self) -> BTreeMap<F, FieldValue> {
        self.fields
    }
}
