//! 身分與權限
//!
//! 身分服務負責登入與工作階段；這裡只讀取「目前是誰、是否為管理員」。

use shop_core::{AdminError, Profile, Result};
use uuid::Uuid;

/// 目前的操作者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl From<&Profile> for Actor {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.id,
            is_admin: profile.is_admin,
        }
    }
}

/// 工作階段提供者
pub trait SessionProvider {
    /// 目前已驗證的操作者；未登入時為 None
    fn current_actor(&self) -> Option<Actor>;
}

/// 確認操作者為管理員
pub fn require_admin<P: SessionProvider + ?Sized>(session: &P, action: &str) -> Result<Actor> {
    let actor = session
        .current_actor()
        .ok_or_else(|| AdminError::Authorization(format!("{}：沒有已登入的工作階段", action)))?;

    if !actor.is_admin {
        return Err(AdminError::Authorization(format!(
            "{}：使用者 {} 不是管理員",
            action, actor.user_id
        )));
    }
    Ok(actor)
}

/// 固定操作者的工作階段（測試與示範用）
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    actor: Option<Actor>,
}

impl StaticSession {
    /// 管理員工作階段
    pub fn admin() -> Self {
        Self {
            actor: Some(Actor {
                user_id: Uuid::new_v4(),
                is_admin: true,
            }),
        }
    }

    /// 已登入但非管理員
    pub fn customer() -> Self {
        Self {
            actor: Some(Actor {
                user_id: Uuid::new_v4(),
                is_admin: false,
            }),
        }
    }

    /// 未登入
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            actor: Some(Actor::from(profile)),
        }
    }

    /// 登出
    pub fn sign_out(&mut self) {
        self.actor = None;
    }
}

impl SessionProvider for StaticSession {
    fn current_actor(&self) -> Option<Actor> {
        self.actor.clone()
    }
}
