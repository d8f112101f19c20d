//! 应用上下文（DI 容器）
//!
//! 统一持有跨模块共享的服务实例，便于在测试中注入替身实现。

use std::sync::Arc;

use crate::cache::{
    CacheHelper, CacheStore, InvalidationCoordinator, MemoryStore, RedisStore, UnavailableStore,
};
use crate::config::{AppConfig, CacheType};
use crate::error::Result;
use crate::{linfo, lwarn};
use crate::logging::{LogComponent, LogStage};
use crate::services::{ApplicationService, UserService};
use crate::store::{
    ApplicationStore, MemoryApplicationStore, MemoryTaskStore, MemoryUserStore, TaskStore,
    UserStore,
};

/// 文档存储集合
#[derive(Clone)]
pub struct DocumentStores {
    pub applications: Arc<dyn ApplicationStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
}

impl DocumentStores {
    /// 进程内文档存储
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            applications: Arc::new(MemoryApplicationStore::new()),
            tasks: Arc::new(MemoryTaskStore::new()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub cache_store: Arc<dyn CacheStore>,
    pub cache: CacheHelper,
    pub invalidator: InvalidationCoordinator,
    pub applications: ApplicationService,
    pub users: UserService,
}

impl AppContext {
    /// 用给定的缓存存储与文档存储装配所有服务
    #[must_use]
    pub fn new(config: AppConfig, cache_store: Arc<dyn CacheStore>, stores: DocumentStores) -> Self {
        let cache = CacheHelper::from_config(Arc::clone(&cache_store), &config.cache);
        let invalidator = InvalidationCoordinator::new(Arc::clone(&cache_store));

        let applications = ApplicationService::new(
            Arc::clone(&stores.applications),
            Arc::clone(&stores.tasks),
            Arc::clone(&stores.users),
            cache.clone(),
            invalidator.clone(),
        );
        let users = UserService::new(
            Arc::clone(&stores.users),
            Arc::clone(&stores.applications),
            cache.clone(),
            invalidator.clone(),
        );

        Self {
            config: Arc::new(config),
            cache_store,
            cache,
            invalidator,
            applications,
            users,
        }
    }

    /// 按配置创建缓存存储，文档存储使用进程内实现
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let cache_store = build_cache_store(&config).await?;
        Ok(Self::new(config, cache_store, DocumentStores::in_memory()))
    }

    /// 全内存装配，用于测试和演示
    #[must_use]
    pub fn in_memory() -> Self {
        let config = AppConfig::default();
        let cache_store: Arc<dyn CacheStore> =
            Arc::new(MemoryStore::new(config.cache.memory_max_entries));
        Self::new(config, cache_store, DocumentStores::in_memory())
    }
}

/// 根据配置创建缓存存储
pub async fn build_cache_store(config: &AppConfig) -> Result<Arc<dyn CacheStore>> {
    match config.cache.cache_type {
        CacheType::Memory => {
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Memory,
                "cache_init",
                "使用内存缓存",
                max_entries = config.cache.memory_max_entries
            );
            Ok(Arc::new(MemoryStore::new(config.cache.memory_max_entries)))
        }
        CacheType::Redis => {
            let redis = config
                .cache
                .redis
                .clone()
                .ok_or_else(|| crate::config_error!("cache_type = \"redis\" 时必须提供 cache.redis 配置"))?;
            match RedisStore::connect(redis).await {
                Ok(store) => Ok(Arc::new(store)),
                // 缓存不可用不影响业务：所有读取降级为未命中
                Err(e) if e.is_cache_error() => {
                    lwarn!(
                        "system",
                        LogStage::Startup,
                        LogComponent::Redis,
                        "cache_unavailable",
                        "Redis 不可用，缓存降级为始终未命中",
                        error = %e
                    );
                    Ok(Arc::new(UnavailableStore::new(e.to_string())))
                }
                Err(e) => Err(e),
            }
        }
    }
}
