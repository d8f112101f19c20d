//! # 应用实体定义
//!
//! 追踪系统中的核心聚合：一个应用包含任务、动态和团队成员

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 应用状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    /// 待办
    #[serde(rename = "To Do")]
    Todo,
    /// 实施中
    #[serde(rename = "Implement")]
    Implement,
    /// 测试中
    #[serde(rename = "Testing")]
    Testing,
    /// 已上线
    #[serde(rename = "Production")]
    Production,
}

impl Status {
    /// 所有状态，按看板顺序排列
    pub const ALL: [Self; 4] = [Self::Todo, Self::Implement, Self::Testing, Self::Production];

    /// 文档库中存储的显示名称
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::Implement => "Implement",
            Self::Testing => "Testing",
            Self::Production => "Production",
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Todo
    }
}

/// 应用优先级
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// 应用文档
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub assets: Vec<String>,
    pub status: Status,
    pub priority: Priority,
    #[serde(default)]
    pub is_trashed: bool,
    /// 关联任务 ID
    #[serde(default)]
    pub tasks: Vec<Uuid>,
    /// 内嵌的动态/评论
    #[serde(default)]
    pub activities: Vec<super::activity::Model>,
    /// 团队成员（用户 ID）
    #[serde(default)]
    pub team_members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建应用的输入
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewApplication {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub assets: Vec<String>,
    pub status: Status,
    pub priority: Priority,
}

/// 编辑应用的部分更新，`None` 表示保持原值
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assets: Option<Vec<String>>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub tasks: Option<Vec<Uuid>>,
    pub team_members: Option<Vec<Uuid>>,
}

impl Model {
    /// 用创建输入构造一个新文档，任务和成员初始为空
    #[must_use]
    pub fn from_new(input: NewApplication) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            assets: input.assets,
            status: input.status,
            priority: input.priority,
            is_trashed: false,
            tasks: Vec::new(),
            activities: Vec::new(),
            team_members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 应用部分更新并刷新 `updated_at`
    pub fn apply(&mut self, changes: Changes) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(assets) = changes.assets {
            self.assets = assets;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(tasks) = changes.tasks {
            self.tasks = tasks;
        }
        if let Some(team_members) = changes.team_members {
            self.team_members = team_members;
        }
        self.updated_at = Utc::now();
    }
}
