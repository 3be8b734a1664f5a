//! 查詢鍵
//!
//! 查詢鍵是明確可比較、可雜湊的值：資源名稱加上依名稱排序的參數。
//! 標準形式為 `resource{name=value,...}`：文字以 JSON 字串編碼，
//! 整數以十進位表示，清單保留給定順序（集合型篩選請用 [`KeyPart::set`]）。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 查詢鍵參數值
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<KeyPart>),
}

impl KeyPart {
    /// 順序無關的集合：排序並去重
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<KeyPart>,
    {
        let mut parts: Vec<KeyPart> = items.into_iter().map(Into::into).collect();
        parts.sort();
        parts.dedup();
        KeyPart::List(parts)
    }

    fn write_canonical(&self, out: &mut String) {
        match self {
            KeyPart::Null => out.push_str("null"),
            KeyPart::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            KeyPart::Int(n) => out.push_str(&n.to_string()),
            KeyPart::Text(s) => {
                let quoted = serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s));
                out.push_str(&quoted);
            }
            KeyPart::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_canonical(out);
                }
                out.push(']');
            }
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Text(value)
    }
}

impl From<&String> for KeyPart {
    fn from(value: &String) -> Self {
        KeyPart::Text(value.clone())
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        KeyPart::Int(i64::from(value))
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

/// 查詢鍵
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    resource: String,
    params: BTreeMap<String, KeyPart>,
}

impl QueryKey {
    /// 創建只有資源名稱的查詢鍵
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: BTreeMap::new(),
        }
    }

    /// 建構器模式：添加參數
    pub fn with(mut self, name: &str, value: impl Into<KeyPart>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// 建構器模式：值存在時才添加參數
    pub fn with_opt<T: Into<KeyPart>>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn param(&self, name: &str) -> Option<&KeyPart> {
        self.params.get(name)
    }

    /// 標準字串形式
    pub fn canonical(&self) -> String {
        let mut out = String::with_capacity(32);
        out.push_str(&self.resource);
        out.push('{');
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(name);
            out.push('=');
            value.write_canonical(&mut out);
        }
        out.push('}');
        out
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// 失效範圍
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    /// 某資源的所有查詢（任何參數）
    Resource(String),
    /// 單一查詢鍵
    Exact(QueryKey),
}

impl QueryFilter {
    pub fn resource(name: impl Into<String>) -> Self {
        QueryFilter::Resource(name.into())
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            QueryFilter::Resource(name) => key.resource == *name,
            QueryFilter::Exact(exact) => key == exact,
        }
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFilter::Resource(name) => write!(f, "{}{{*}}", name),
            QueryFilter::Exact(key) => write!(f, "{}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_order_does_not_matter() {
        let a = QueryKey::new("orders").with("page", 1i64).with("status", "All");
        let b = QueryKey::new("orders").with("status", "All").with("page", 1i64);
        assert_eq!(a, b);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), r#"orders{page=1,status="All"}"#);
    }

    #[test]
    fn test_text_and_int_are_distinct() {
        let text = QueryKey::new("orders").with("page", "1");
        let int = QueryKey::new("orders").with("page", 1i64);
        assert_ne!(text, int);
        assert_ne!(text.canonical(), int.canonical());
    }

    #[test]
    fn test_set_is_order_insensitive() {
        let a = QueryKey::new("products").with("brands", KeyPart::set(["b", "a", "a"]));
        let b = QueryKey::new("products").with("brands", KeyPart::set(["a", "b"]));
        assert_eq!(a, b);
        assert_eq!(a.canonical(), r#"products{brands=["a","b"]}"#);
    }

    #[test]
    fn test_text_is_escaped() {
        let key = QueryKey::new("orders").with("search", "a\"b,c=d");
        assert_eq!(key.canonical(), r#"orders{search="a\"b,c=d"}"#);
    }

    #[test]
    fn test_with_opt_skips_none() {
        let key = QueryKey::new("products").with_opt::<&str>("stock_status", None);
        assert_eq!(key.canonical(), "products{}");
    }

    #[test]
    fn test_filter_matching() {
        let list = QueryKey::new("products").with("page", 2i64);
        let detail = QueryKey::new("product").with("id", "42");

        assert!(QueryFilter::resource("products").matches(&list));
        assert!(!QueryFilter::resource("products").matches(&detail));
        assert!(QueryFilter::Exact(detail.clone()).matches(&detail));
        assert!(!QueryFilter::Exact(detail).matches(&QueryKey::new("product").with("id", "43")));
    }
}
