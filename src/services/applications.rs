//! # 应用查询与变更服务
//!
//! 读路径统一走缓存辅助层，写路径在文档库提交后清除应用失效组。

use entity::application::{self, Changes, NewApplication};
use entity::task::NewTask;
use entity::{Activity, Application, Task, activity::NewActivity};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{
    Aggregate, ApplicationFilter, CacheHelper, CacheKeyBuilder, InvalidationCoordinator, Page,
};
use crate::error::{Result, TrackerError};
use crate::logging::{LogComponent, LogStage};
use crate::store::{
    ApplicationPipeline, ApplicationQuery, ApplicationStore, ApplicationUpdate, CountBucket,
    TaskStore, UserStore,
};
use crate::{ensure_valid, linfo, lwarn};

/// 应用服务
#[derive(Clone)]
pub struct ApplicationService {
    applications: Arc<dyn ApplicationStore>,
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
    cache: CacheHelper,
    invalidator: InvalidationCoordinator,
}

impl ApplicationService {
    #[must_use]
    pub fn new(
        applications: Arc<dyn ApplicationStore>,
        tasks: Arc<dyn TaskStore>,
        users: Arc<dyn UserStore>,
        cache: CacheHelper,
        invalidator: InvalidationCoordinator,
    ) -> Self {
        Self {
            applications,
            tasks,
            users,
            cache,
            invalidator,
        }
    }

    /// 未删除的应用列表，可按状态过滤、分页
    pub async fn list(&self, filter: ApplicationFilter, page: Option<Page>) -> Result<Vec<Application>> {
        let key = match page {
            Some(page) => CacheKeyBuilder::applications_page(filter, page.page, page.limit),
            None => CacheKeyBuilder::applications(filter),
        };

        let mut query = ApplicationQuery::active().with_status(filter.status());
        if let Some(page) = page {
            ensure_valid!(page.page > 0 && page.limit > 0, "分页参数必须大于0");
            query = query.paginate(page.offset(), page.limit as usize);
        }

        self.cache
            .get_or_populate(&key, || self.applications.find(&query))
            .await
    }

    /// 按标题搜索（不区分大小写），搜索词原样作为缓存键的一部分
    pub async fn search(&self, filter: ApplicationFilter, term: &str) -> Result<Vec<Application>> {
        ensure_valid!(!term.trim().is_empty(), "搜索词不能为空");

        let key = CacheKeyBuilder::application_search(filter, term);
        let query = ApplicationQuery::active()
            .with_status(filter.status())
            .with_title(term);

        self.cache
            .get_or_populate(&key, || self.applications.find(&query))
            .await
    }

    /// 按状态统计
    pub async fn status_counts(&self) -> Result<Vec<CountBucket>> {
        self.cache
            .get_or_populate(&CacheKeyBuilder::status_count(), || {
                self.applications.aggregate(ApplicationPipeline::GroupByStatus)
            })
            .await
    }

    /// 按优先级统计
    pub async fn priority_counts(&self) -> Result<Vec<CountBucket>> {
        self.cache
            .get_or_populate(&CacheKeyBuilder::priority_count(), || {
                self.applications.aggregate(ApplicationPipeline::GroupByPriority)
            })
            .await
    }

    /// 每个成员参与的应用数，桶标识为用户 ID
    pub async fn applications_per_user(&self) -> Result<Vec<CountBucket>> {
        self.cache
            .get_or_populate(&CacheKeyBuilder::user_applications_count(), || {
                self.applications.aggregate(ApplicationPipeline::GroupByTeamMember)
            })
            .await
    }

    /// 回收站中的应用
    pub async fn trashed(&self) -> Result<Vec<Application>> {
        let query = ApplicationQuery::trashed();
        self.cache
            .get_or_populate(&CacheKeyBuilder::trashed_applications(), || {
                self.applications.find(&query)
            })
            .await
    }

    pub async fn create(&self, input: NewApplication) -> Result<Application> {
        ensure_valid!(!input.title.trim().is_empty(), "应用标题不能为空");
        ensure_valid!(!input.description.trim().is_empty(), "应用描述不能为空");

        let created = self
            .invalidator
            .commit_then_invalidate(
                &[Aggregate::Application],
                self.applications.create(Application::from_new(input)),
            )
            .await?;

        linfo!("system", LogStage::Mutation, LogComponent::Applications, "create_application", &format!("应用已创建: {}", created.title), application_id = %created.id);
        Ok(created)
    }

    /// 部分更新
    pub async fn edit(&self, id: Uuid, changes: Changes) -> Result<Application> {
        if let Some(title) = &changes.title {
            ensure_valid!(!title.trim().is_empty(), "应用标题不能为空");
        }

        self.update(id, ApplicationUpdate::Set(changes), "edit_application")
            .await
    }

    /// 移入回收站
    pub async fn trash(&self, id: Uuid) -> Result<Application> {
        self.update(id, ApplicationUpdate::SetTrashed(true), "trash_application")
            .await
    }

    /// 从回收站恢复
    pub async fn restore(&self, id: Uuid) -> Result<Application> {
        self.update(id, ApplicationUpdate::SetTrashed(false), "restore_application")
            .await
    }

    /// 永久删除，只允许删除回收站中的应用
    pub async fn delete(&self, id: Uuid) -> Result<Application> {
        let existing = self
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("application", id))?;
        ensure_valid!(existing.is_trashed, "只能删除回收站中的应用");

        let write = async {
            self.applications
                .find_by_id_and_delete(id)
                .await?
                .ok_or_else(|| TrackerError::not_found("application", id))
        };
        let deleted = self
            .invalidator
            .commit_then_invalidate(&[Aggregate::Application], write)
            .await?;

        linfo!("system", LogStage::Mutation, LogComponent::Applications, "delete_application", &format!("应用已永久删除: {}", deleted.title), application_id = %id);
        Ok(deleted)
    }

    /// 添加团队成员
    pub async fn add_member(&self, id: Uuid, user_id: Uuid) -> Result<Application> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("user", user_id))?;

        self.update(id, ApplicationUpdate::AddTeamMember(user_id), "add_team_member")
            .await
    }

    /// 创建任务并挂到应用下
    pub async fn add_task(&self, id: Uuid, input: NewTask) -> Result<Task> {
        ensure_valid!(
            !input.title.trim().is_empty() && !input.tag.trim().is_empty(),
            "任务标题和标签不能为空"
        );

        self.applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("application", id))?;

        let write = async {
            let task = self.tasks.create(Task::from_new(input)).await?;
            self.applications
                .find_by_id_and_update(id, ApplicationUpdate::PushTask(task.id))
                .await?
                .ok_or_else(|| TrackerError::not_found("application", id))?;
            Ok(task)
        };
        let task = self
            .invalidator
            .commit_then_invalidate(&[Aggregate::Application], write)
            .await?;

        linfo!("system", LogStage::Mutation, LogComponent::Applications, "add_task", &format!("任务已添加: {}", task.title), application_id = %id, task_id = %task.id);
        Ok(task)
    }

    /// 以 `author_id` 的名义添加动态，用户名在写入时快照
    pub async fn add_activity(&self, id: Uuid, author_id: Uuid, input: NewActivity) -> Result<Activity> {
        ensure_valid!(
            !input.title.trim().is_empty() && !input.comment.trim().is_empty(),
            "动态标题和内容不能为空"
        );

        let author = self
            .users
            .find_by_id(author_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("user", author_id))?;

        let activity = Activity::new(input, author.user_name);
        let write = async {
            self.applications
                .find_by_id_and_update(id, ApplicationUpdate::PushActivity(activity.clone()))
                .await?
                .ok_or_else(|| TrackerError::not_found("application", id))
        };
        self.invalidator
            .commit_then_invalidate(&[Aggregate::Application], write)
            .await?;

        linfo!("system", LogStage::Mutation, LogComponent::Applications, "add_activity", &format!("动态已添加: {}", activity.title), application_id = %id);
        Ok(activity)
    }

    async fn update(&self, id: Uuid, update: ApplicationUpdate, operation: &str) -> Result<Application> {
        let write = async {
            self.applications
                .find_by_id_and_update(id, update)
                .await?
                .ok_or_else(|| TrackerError::not_found("application", id))
        };

        match self
            .invalidator
            .commit_then_invalidate(&[Aggregate::Application], write)
            .await
        {
            Ok(updated) => {
                linfo!("system", LogStage::Mutation, LogComponent::Applications, operation, &format!("应用已更新: {}", updated.title), application_id = %id);
                Ok(updated)
            }
            Err(e) => {
                lwarn!("system", LogStage::Mutation, LogComponent::Applications, operation, &format!("应用更新失败: {id}"), error = %e);
                Err(e)
            }
        }
    }
}

/// 状态统计中某个状态的计数，没有该状态的应用时为 0
#[must_use]
pub fn count_for(buckets: &[CountBucket], status: application::Status) -> u64 {
    buckets
        .iter()
        .find(|bucket| bucket.id == status.label())
        .map_or(0, |bucket| bucket.count)
}
