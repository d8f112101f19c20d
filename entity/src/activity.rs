//! # 动态/评论实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 应用下的一条动态，内嵌在应用文档中
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Uuid,
    pub title: String,
    pub comment: String,
    /// 发表者用户名（写入时快照）
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

/// 新增动态的输入
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewActivity {
    pub title: String,
    pub comment: String,
}

impl Model {
    #[must_use]
    pub fn new(input: NewActivity, user_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            comment: input.comment,
            user_name: user_name.into(),
            created_at: Utc::now(),
        }
    }
}
