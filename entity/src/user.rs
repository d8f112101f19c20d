//! # 用户实体定义
//!
//! 用户文档及其对外（可缓存）视图

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户文档
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Model {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub role: String,
    /// 由认证层计算好的密码哈希，不进入缓存
    pub password_hash: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 用户的公开视图，列表与搜索结果只缓存这一形态
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Model> for Profile {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            user_name: model.user_name.clone(),
            email: model.email.clone(),
            role: model.role.clone(),
            is_admin: model.is_admin,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

/// 注册用户的输入
#[derive(Clone, Debug)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
}

/// 资料更新，`None` 表示保持原值
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    pub user_name: Option<String>,
    pub role: Option<String>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
}

impl Model {
    /// 新注册用户默认启用、非管理员
    #[must_use]
    pub fn from_new(input: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_name: input.user_name,
            email: input.email,
            role: input.role,
            password_hash: input.password_hash,
            is_admin: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: ProfileChanges) {
        if let Some(user_name) = changes.user_name {
            self.user_name = user_name;
        }
        if let Some(role) = changes.role {
            self.role = role;
        }
        if let Some(is_admin) = changes.is_admin {
            self.is_admin = is_admin;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}
