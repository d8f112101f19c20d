//! # 任务实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 任务状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "To Do")]
    Todo,
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

/// 任务文档
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Uuid,
    pub title: String,
    pub deadline: DateTime<Utc>,
    /// 任务图标标签
    pub tag: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建任务的输入
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub deadline: DateTime<Utc>,
    pub tag: String,
    #[serde(default)]
    pub status: Option<Status>,
}

impl Model {
    /// 未指定状态时默认为 "To Do"
    #[must_use]
    pub fn from_new(input: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            deadline: input.deadline,
            tag: input.tag,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}
