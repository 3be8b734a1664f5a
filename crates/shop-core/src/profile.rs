//! 使用者資料

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 使用者資料（由身分服務提供）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    /// 缺少此旗標視為非管理員
    #[serde(default)]
    pub is_admin: bool,
}

impl Profile {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            full_name: None,
            email: None,
            avatar_url: None,
            is_admin: false,
        }
    }

    /// 建構器模式：設置管理員旗標
    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// 建構器模式：設置電子郵件
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// 顯示名稱：姓名、電子郵件、ID 依序擇一
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_admin_flag_defaults_to_false() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"id":"{}","full_name":null,"email":null,"avatar_url":null}}"#, id);
        let profile: Profile = serde_json::from_str(&json).unwrap();
        assert!(!profile.is_admin);
        assert_eq!(profile.display_name(), id.to_string());
    }

    #[test]
    fn test_display_name_prefers_email_over_id() {
        let profile = Profile::new(Uuid::new_v4()).with_email("admin@shop.test").with_admin(true);
        assert_eq!(profile.display_name(), "admin@shop.test");
        assert!(profile.is_admin);
    }
}
