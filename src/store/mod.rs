//! # 文档存储接口
//!
//! 缓存层背后的权威数据源。这里只定义查询处理器需要的最小契约，
//! 具体持久化由外部文档库实现；[`memory`] 提供进程内实现供测试和演示使用。

pub mod memory;

use async_trait::async_trait;
use entity::application::{self, Priority, Status};
use entity::{Activity, Application, Task, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub use memory::{MemoryApplicationStore, MemoryTaskStore, MemoryUserStore};

/// 应用查询条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationQuery {
    /// 限定状态
    pub status: Option<Status>,
    /// 是否在回收站中
    pub trashed: bool,
    /// 标题包含（不区分大小写，按字面匹配）
    pub title_contains: Option<String>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl ApplicationQuery {
    /// 未删除的应用
    #[must_use]
    pub fn active() -> Self {
        Self::default()
    }

    /// 回收站中的应用
    #[must_use]
    pub fn trashed() -> Self {
        Self {
            trashed: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: Option<Status>) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_title(mut self, term: impl Into<String>) -> Self {
        self.title_contains = Some(term.into());
        self
    }

    #[must_use]
    pub const fn paginate(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    /// 文档是否满足条件（不含分页）
    #[must_use]
    pub fn matches(&self, app: &Application) -> bool {
        app.is_trashed == self.trashed
            && self.status.is_none_or(|status| app.status == status)
            && self
                .title_contains
                .as_deref()
                .is_none_or(|term| contains_ignore_case(&app.title, term))
    }
}

/// 应用的原子更新操作
#[derive(Debug, Clone)]
pub enum ApplicationUpdate {
    /// 部分字段更新
    Set(application::Changes),
    /// 移入/移出回收站
    SetTrashed(bool),
    /// 添加团队成员（已存在时不重复）
    AddTeamMember(Uuid),
    /// 追加任务引用
    PushTask(Uuid),
    /// 追加动态
    PushActivity(Activity),
}

/// 应用聚合统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationPipeline {
    /// 按状态分组计数
    GroupByStatus,
    /// 按优先级分组计数
    GroupByPriority,
    /// 按团队成员展开后分组计数
    GroupByTeamMember,
}

/// 聚合结果的一个桶
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBucket {
    pub id: String,
    pub count: u64,
}

impl CountBucket {
    #[must_use]
    pub fn new(id: impl Into<String>, count: u64) -> Self {
        Self {
            id: id.into(),
            count,
        }
    }

    /// 状态统计的桶标识
    #[must_use]
    pub fn status(status: Status, count: u64) -> Self {
        Self::new(status.label(), count)
    }

    /// 优先级统计的桶标识
    #[must_use]
    pub fn priority(priority: Priority, count: u64) -> Self {
        Self::new(priority.label(), count)
    }
}

/// 用户查询条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    /// 用户名包含（不区分大小写，按字面匹配）
    pub name_contains: Option<String>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl UserQuery {
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        self.name_contains
            .as_deref()
            .is_none_or(|term| contains_ignore_case(&user.user_name, term))
    }
}

/// 应用文档存储
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// 查询，按创建时间倒序
    async fn find(&self, query: &ApplicationQuery) -> Result<Vec<Application>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>>;

    async fn create(&self, application: Application) -> Result<Application>;

    /// 更新并返回更新后的文档，不存在返回 `None`
    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<Option<Application>>;

    /// 删除并返回被删除的文档，不存在返回 `None`
    async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<Application>>;

    /// 对未删除的应用执行分组统计
    async fn aggregate(&self, pipeline: ApplicationPipeline) -> Result<Vec<CountBucket>>;

    /// 把用户从所有应用的团队成员中移除，返回受影响的应用数
    async fn remove_team_member(&self, user_id: Uuid) -> Result<u64>;
}

/// 任务文档存储
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: Task) -> Result<Task>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>>;
}

/// 用户文档存储
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 查询，按创建时间倒序
    async fn find(&self, query: &UserQuery) -> Result<Vec<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// 按邮箱查找（不区分大小写）
    async fn find_one_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn create(&self, user: User) -> Result<User>;

    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        changes: entity::user::ProfileChanges,
    ) -> Result<Option<User>>;

    /// 按邮箱更新，返回更新后的文档
    async fn find_one_and_update(
        &self,
        email: &str,
        changes: entity::user::ProfileChanges,
    ) -> Result<Option<User>>;

    async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<User>>;

    async fn count(&self) -> Result<u64>;
}

/// 不区分大小写的字面包含判断
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
