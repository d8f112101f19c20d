//! # 进程内文档存储
//!
//! 基于 `RwLock<HashMap>` 的文档存储实现，查询语义与文档库一致：
//! 结果按创建时间倒序，统计只计算未删除的应用。

use async_trait::async_trait;
use chrono::Utc;
use entity::user::ProfileChanges;
use entity::{Application, Task, User};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ApplicationPipeline, ApplicationQuery, ApplicationStore, ApplicationUpdate, CountBucket,
    TaskStore, UserQuery, UserStore,
};
use crate::error::Result;
use crate::store_error;

/// 模拟文档库故障的开关，打开后所有写操作返回存储错误
#[derive(Debug, Default, Clone)]
pub struct FaultSwitch(Arc<AtomicBool>);

impl FaultSwitch {
    pub fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::SeqCst);
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.0.load(Ordering::SeqCst) {
            Err(store_error!("文档库不可用: {operation}"))
        } else {
            Ok(())
        }
    }
}

fn paginate<T>(items: Vec<T>, skip: usize, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// 进程内应用存储
#[derive(Debug, Default, Clone)]
pub struct MemoryApplicationStore {
    documents: Arc<RwLock<HashMap<Uuid, Application>>>,
    faults: FaultSwitch,
}

impl MemoryApplicationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 故障开关
    #[must_use]
    pub fn faults(&self) -> &FaultSwitch {
        &self.faults
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn find(&self, query: &ApplicationQuery) -> Result<Vec<Application>> {
        let documents = self.documents.read().await;
        let mut found: Vec<Application> = documents
            .values()
            .filter(|app| query.matches(app))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(found, query.skip, query.limit))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn create(&self, application: Application) -> Result<Application> {
        self.faults.check("create application")?;
        self.documents
            .write()
            .await
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<Option<Application>> {
        self.faults.check("update application")?;
        let mut documents = self.documents.write().await;
        let Some(app) = documents.get_mut(&id) else {
            return Ok(None);
        };

        match update {
            ApplicationUpdate::Set(changes) => app.apply(changes),
            ApplicationUpdate::SetTrashed(trashed) => {
                app.is_trashed = trashed;
                app.updated_at = Utc::now();
            }
            ApplicationUpdate::AddTeamMember(user_id) => {
                if !app.team_members.contains(&user_id) {
                    app.team_members.push(user_id);
                }
                app.updated_at = Utc::now();
            }
            ApplicationUpdate::PushTask(task_id) => {
                app.tasks.push(task_id);
                app.updated_at = Utc::now();
            }
            ApplicationUpdate::PushActivity(activity) => {
                app.activities.push(activity);
                app.updated_at = Utc::now();
            }
        }
        Ok(Some(app.clone()))
    }

    async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<Application>> {
        self.faults.check("delete application")?;
        Ok(self.documents.write().await.remove(&id))
    }

    async fn aggregate(&self, pipeline: ApplicationPipeline) -> Result<Vec<CountBucket>> {
        let documents = self.documents.read().await;
        let active = documents.values().filter(|app| !app.is_trashed);

        let buckets = match pipeline {
            ApplicationPipeline::GroupByStatus => {
                let mut counts = BTreeMap::new();
                for app in active {
                    *counts.entry(app.status).or_insert(0u64) += 1;
                }
                counts
                    .into_iter()
                    .map(|(status, count)| CountBucket::status(status, count))
                    .collect()
            }
            ApplicationPipeline::GroupByPriority => {
                let mut counts = BTreeMap::new();
                for app in active {
                    *counts.entry(app.priority).or_insert(0u64) += 1;
                }
                counts
                    .into_iter()
                    .map(|(priority, count)| CountBucket::priority(priority, count))
                    .collect()
            }
            ApplicationPipeline::GroupByTeamMember => {
                let mut counts: BTreeMap<Uuid, u64> = BTreeMap::new();
                for member in active.flat_map(|app| app.team_members.iter()) {
                    *counts.entry(*member).or_insert(0) += 1;
                }
                counts
                    .into_iter()
                    .map(|(member, count)| CountBucket::new(member.to_string(), count))
                    .collect()
            }
        };
        Ok(buckets)
    }

    async fn remove_team_member(&self, user_id: Uuid) -> Result<u64> {
        self.faults.check("remove team member")?;
        let mut documents = self.documents.write().await;
        let mut affected = 0;
        for app in documents.values_mut() {
            let before = app.team_members.len();
            app.team_members.retain(|member| *member != user_id);
            if app.team_members.len() != before {
                app.updated_at = Utc::now();
                affected += 1;
            }
        }
        Ok(affected)
    }
}

/// 进程内任务存储
#[derive(Debug, Default, Clone)]
pub struct MemoryTaskStore {
    documents: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl MemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        self.documents.write().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }
}

/// 进程内用户存储
#[derive(Debug, Default, Clone)]
pub struct MemoryUserStore {
    documents: Arc<RwLock<HashMap<Uuid, User>>>,
    faults: FaultSwitch,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn faults(&self) -> &FaultSwitch {
        &self.faults
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, query: &UserQuery) -> Result<Vec<User>> {
        let documents = self.documents.read().await;
        let mut found: Vec<User> = documents
            .values()
            .filter(|user| query.matches(user))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(found, query.skip, query.limit))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn find_one_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User> {
        self.faults.check("create user")?;
        self.documents.write().await.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id_and_update(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>> {
        self.faults.check("update user")?;
        let mut documents = self.documents.write().await;
        Ok(documents.get_mut(&id).map(|user| {
            user.apply(changes);
            user.clone()
        }))
    }

    async fn find_one_and_update(&self, email: &str, changes: ProfileChanges) -> Result<Option<User>> {
        self.faults.check("update user")?;
        let mut documents = self.documents.write().await;
        Ok(documents
            .values_mut()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .map(|user| {
                user.apply(changes);
                user.clone()
            }))
    }

    async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<User>> {
        self.faults.check("delete user")?;
        Ok(self.documents.write().await.remove(&id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.documents.read().await.len() as u64)
    }
}
