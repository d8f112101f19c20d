//! 集成测试共用的替身实现

#![allow(dead_code)]

use async_trait::async_trait;
use entity::User;
use entity::user::{NewUser, ProfileChanges};
use kepler_cache::Result;
use kepler_cache::TrackerError;
use kepler_cache::cache::{CacheStore, MemoryStore};
use kepler_cache::store::{MemoryUserStore, UserQuery, UserStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// 指定键或模式上的删除会失败的缓存存储，其余操作委托给内存存储
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: HashSet<String>,
}

impl FlakyStore {
    pub fn failing_on(targets: &[&str]) -> Self {
        Self {
            inner: MemoryStore::new(1_000),
            failing: targets.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.inner.set_with_expiry(key, value, ttl_seconds).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if self.failing.contains(key) {
            return Err(TrackerError::cache(format!("injected delete failure: {key}")));
        }
        self.inner.delete(key).await
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        if self.failing.contains(pattern) {
            return Err(TrackerError::cache(format!("injected scan failure: {pattern}")));
        }
        self.inner.keys_matching(pattern).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }
}

/// 统计 `find` 调用次数并人为放慢查询的用户存储
#[derive(Clone, Default)]
pub struct CountingUserStore {
    pub inner: MemoryUserStore,
    finds: Arc<AtomicUsize>,
    pub delay: Duration,
}

impl CountingUserStore {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for CountingUserStore {
    async fn find(&self, query: &UserQuery) -> Result<Vec<User>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.find(query).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.inner.find_by_id(id).await
    }

    async fn find_one_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.find_one_by_email(email).await
    }

    async fn create(&self, user: User) -> Result<User> {
        self.inner.create(user).await
    }

    async fn find_by_id_and_update(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>> {
        self.inner.find_by_id_and_update(id, changes).await
    }

    async fn find_one_and_update(&self, email: &str, changes: ProfileChanges) -> Result<Option<User>> {
        self.inner.find_one_and_update(email, changes).await
    }

    async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<User>> {
        self.inner.find_by_id_and_delete(id).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        user_name: name.to_string(),
        email: format!("{name}@example.com"),
        role: "developer".to_string(),
        password_hash: "hash".to_string(),
    }
}

/// 把具体存储转换为注入用的 trait 对象
pub fn shared<S: CacheStore + 'static>(store: S) -> Arc<dyn CacheStore> {
    Arc::new(store)
}
