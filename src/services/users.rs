//! # 用户查询与变更服务
//!
//! 只缓存用户的公开视图 [`Profile`]，密码哈希永远不进入缓存。

use entity::User;
use entity::user::{NewUser, Profile, ProfileChanges};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{Aggregate, CacheHelper, CacheKeyBuilder, InvalidationCoordinator, Page};
use crate::error::{Result, TrackerError};
use crate::logging::{LogComponent, LogStage};
use crate::store::{ApplicationStore, UserQuery, UserStore};
use crate::{ensure_valid, linfo};

/// 用户服务
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    applications: Arc<dyn ApplicationStore>,
    cache: CacheHelper,
    invalidator: InvalidationCoordinator,
}

impl UserService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        applications: Arc<dyn ApplicationStore>,
        cache: CacheHelper,
        invalidator: InvalidationCoordinator,
    ) -> Self {
        Self {
            users,
            applications,
            cache,
            invalidator,
        }
    }

    /// 用户列表，按注册时间倒序
    pub async fn list(&self, page: Option<Page>) -> Result<Vec<Profile>> {
        let mut query = UserQuery::default();
        if let Some(page) = page {
            ensure_valid!(page.page > 0 && page.limit > 0, "分页参数必须大于0");
            query.skip = page.offset();
            query.limit = Some(page.limit as usize);
        }

        self.cache
            .get_or_populate(&CacheKeyBuilder::users(page), || self.find_profiles(query))
            .await
    }

    /// 按用户名搜索（不区分大小写）
    pub async fn search(&self, term: &str) -> Result<Vec<Profile>> {
        ensure_valid!(!term.trim().is_empty(), "搜索词不能为空");

        let query = UserQuery {
            name_contains: Some(term.to_string()),
            ..UserQuery::default()
        };
        self.cache
            .get_or_populate(&CacheKeyBuilder::user_search(term), || self.find_profiles(query))
            .await
    }

    /// 用户总数
    pub async fn count(&self) -> Result<u64> {
        self.cache
            .get_or_populate(&CacheKeyBuilder::user_count(), || self.users.count())
            .await
    }

    /// 注册新用户，邮箱不区分大小写唯一
    pub async fn register(&self, input: NewUser) -> Result<Profile> {
        ensure_valid!(!input.user_name.trim().is_empty(), "用户名不能为空");
        ensure_valid!(input.email.contains('@'), "邮箱格式无效");
        ensure_valid!(!input.password_hash.is_empty(), "密码不能为空");

        let duplicate = self.users.find_one_by_email(&input.email).await?;
        ensure_valid!(duplicate.is_none(), "邮箱已被注册");

        let user = self
            .invalidator
            .commit_then_invalidate(&[Aggregate::User], self.users.create(User::from_new(input)))
            .await?;

        linfo!("system", LogStage::Mutation, LogComponent::Users, "register_user", &format!("用户已注册: {}", user.user_name), user_id = %user.id);
        Ok(Profile::from(&user))
    }

    /// 更新资料
    pub async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Profile> {
        if let Some(user_name) = &changes.user_name {
            ensure_valid!(!user_name.trim().is_empty(), "用户名不能为空");
        }

        let write = async {
            self.users
                .find_by_id_and_update(id, changes)
                .await?
                .ok_or_else(|| TrackerError::not_found("user", id))
        };
        let user = self
            .invalidator
            .commit_then_invalidate(&[Aggregate::User], write)
            .await?;

        linfo!("system", LogStage::Mutation, LogComponent::Users, "update_profile", &format!("用户资料已更新: {}", user.user_name), user_id = %id);
        Ok(Profile::from(&user))
    }

    /// 按邮箱启用/停用账户，状态未变化时返回校验错误
    pub async fn set_active(&self, email: &str, active: bool) -> Result<Profile> {
        let existing = self
            .users
            .find_one_by_email(email)
            .await?
            .ok_or_else(|| TrackerError::not_found("user", email))?;
        ensure_valid!(
            existing.is_active != active,
            if active { "账户已处于启用状态" } else { "账户已处于停用状态" }
        );

        let changes = ProfileChanges {
            is_active: Some(active),
            ..ProfileChanges::default()
        };
        let write = async {
            self.users
                .find_one_and_update(email, changes)
                .await?
                .ok_or_else(|| TrackerError::not_found("user", email))
        };
        let user = self
            .invalidator
            .commit_then_invalidate(&[Aggregate::User], write)
            .await?;

        linfo!("system", LogStage::Mutation, LogComponent::Users, "set_active", &format!("账户状态已更新: {}", user.email), active = active);
        Ok(Profile::from(&user))
    }

    /// 删除用户并把其从所有应用的团队成员中移除
    ///
    /// 两步写入各自提交后立即清除对应的失效组：删除用户清除用户组，
    /// 移除成员清除应用组（成员参与数统计属于应用组）。第二步失败时
    /// 用户组已经清除，错误照常返回。
    pub async fn delete(&self, id: Uuid) -> Result<Profile> {
        let remove_user = async {
            self.users
                .find_by_id_and_delete(id)
                .await?
                .ok_or_else(|| TrackerError::not_found("user", id))
        };
        let user = self
            .invalidator
            .commit_then_invalidate(&[Aggregate::User], remove_user)
            .await?;

        let affected = self
            .invalidator
            .commit_then_invalidate(
                &[Aggregate::Application],
                self.applications.remove_team_member(id),
            )
            .await?;

        linfo!("system", LogStage::Mutation, LogComponent::Users, "delete_user", &format!("用户已删除: {}", user.user_name), user_id = %id, applications = affected);
        Ok(Profile::from(&user))
    }

    async fn find_profiles(&self, query: UserQuery) -> Result<Vec<Profile>> {
        let users = self.users.find(&query).await?;
        Ok(users.iter().map(Profile::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryStore};
    use crate::store::{MemoryApplicationStore, MemoryUserStore};
    use pretty_assertions::assert_eq;

    fn service() -> (UserService, Arc<MemoryStore>) {
        let cache = Arc::new(MemoryStore::new(1_000));
        let service = UserService::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryApplicationStore::new()),
            CacheHelper::new(cache.clone()),
            InvalidationCoordinator::new(cache.clone()),
        );
        (service, cache)
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            user_name: name.to_string(),
            email: format!("{name}@example.com"),
            role: "developer".to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_refreshes_count_and_listing() {
        let (service, _) = service();
        assert_eq!(service.count().await.unwrap(), 0);
        assert!(service.list(None).await.unwrap().is_empty());

        service.register(new_user("alice")).await.unwrap();

        assert_eq!(service.count().await.unwrap(), 1);
        assert_eq!(service.list(None).await.unwrap()[0].user_name, "alice");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let (service, _) = service();
        service.register(new_user("alice")).await.unwrap();

        let mut again = new_user("alice2");
        again.email = "ALICE@example.com".to_string();
        assert!(matches!(
            service.register(again).await,
            Err(TrackerError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_cached_listing_has_no_password() {
        let (service, cache) = service();
        service.register(new_user("alice")).await.unwrap();
        service.list(None).await.unwrap();

        let raw = cache.get("users:all").await.unwrap().unwrap();
        assert!(!raw.contains("argon2"));
        assert!(raw.contains("alice@example.com"));
    }

    #[tokio::test]
    async fn test_set_active_toggles_once() {
        let (service, _) = service();
        service.register(new_user("bob")).await.unwrap();

        let disabled = service.set_active("bob@example.com", false).await.unwrap();
        assert!(!disabled.is_active);
        assert!(matches!(
            service.set_active("bob@example.com", false).await,
            Err(TrackerError::Validation { .. })
        ));
        assert!(matches!(
            service.set_active("nobody@example.com", true).await,
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_sees_profile_update() {
        let (service, _) = service();
        let bob = service.register(new_user("bob")).await.unwrap();
        assert_eq!(service.search("rob").await.unwrap().len(), 0);

        service
            .update_profile(
                bob.id,
                ProfileChanges {
                    user_name: Some("robert".to_string()),
                    ..ProfileChanges::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(service.search("rob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_invalidates_both_groups() {
        let (service, cache) = service();
        let alice = service.register(new_user("alice")).await.unwrap();
        cache
            .set_with_expiry("users:applications-count", "[]", 60)
            .await
            .unwrap();
        service.count().await.unwrap();

        service.delete(alice.id).await.unwrap();

        assert_eq!(cache.get("users:count").await.unwrap(), None);
        assert_eq!(cache.get("users:applications-count").await.unwrap(), None);
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_clears_user_group_when_member_removal_fails() {
        let cache = Arc::new(MemoryStore::new(1_000));
        let users = Arc::new(MemoryUserStore::new());
        let applications = Arc::new(MemoryApplicationStore::new());
        let service = UserService::new(
            users.clone(),
            applications.clone(),
            CacheHelper::new(cache.clone()),
            InvalidationCoordinator::new(cache.clone()),
        );
        let alice = service.register(new_user("alice")).await.unwrap();
        assert_eq!(service.count().await.unwrap(), 1);
        assert_eq!(service.list(None).await.unwrap().len(), 1);

        applications.faults().set(true);
        let result = service.delete(alice.id).await;

        assert!(matches!(result, Err(TrackerError::Store { .. })));
        assert_eq!(users.count().await.unwrap(), 0);
        assert_eq!(cache.get("users:count").await.unwrap(), None);
        assert_eq!(cache.get("users:all").await.unwrap(), None);
        assert_eq!(service.count().await.unwrap(), 0);
        assert!(service.list(None).await.unwrap().is_empty());
    }
}
