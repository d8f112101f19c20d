//! # 缓存辅助层
//!
//! 所有查询处理器共用的读穿透原语。
//!
//! 缓存只是建议性的：这里的每个函数都在内部吞掉存储层错误并记录日志，
//! 调用方看到的"缓存不可用"和"缓存未命中"完全一样，结果永远正确，只是更慢。

use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::keys::CacheKey;
use super::single_flight::SingleFlight;
use super::store::CacheStore;
use super::strategies::{CacheTtl, TtlPolicy};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lwarn};

/// 缓存统计信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    /// 被降级为未命中或被忽略的存储错误次数
    pub error_count: u64,
    /// 正在回源加载的键数量（未开启单飞时为 0）
    pub in_flight: usize,
    pub cache_type: &'static str,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

/// 缓存辅助器
///
/// 存储适配器通过构造函数注入，便于替换为测试替身。
#[derive(Clone)]
pub struct CacheHelper {
    store: Arc<dyn CacheStore>,
    ttl_policy: TtlPolicy,
    single_flight: Option<SingleFlight>,
    counters: Arc<Counters>,
}

impl CacheHelper {
    /// 使用默认 TTL 策略创建，不启用单飞
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl_policy: TtlPolicy::default(),
            single_flight: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// 根据缓存配置创建
    #[must_use]
    pub fn from_config(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self::new(store)
            .with_ttl_policy(TtlPolicy::from_config(config))
            .with_single_flight(config.single_flight)
    }

    #[must_use]
    pub fn with_ttl_policy(mut self, ttl_policy: TtlPolicy) -> Self {
        self.ttl_policy = ttl_policy;
        self
    }

    #[must_use]
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled.then(SingleFlight::new);
        self
    }

    /// 底层存储
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    #[must_use]
    pub const fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl_policy
    }

    /// 读取缓存
    ///
    /// 命中时反序列化并返回；未命中、存储错误、反序列化失败都返回 `None`。
    /// 反序列化失败的条目不会被主动删除，等待 TTL 过期或下一次失效。
    pub async fn get_cache<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                ldebug!("system", LogStage::Cache, LogComponent::Helper, "cache_miss", &format!("缓存未命中: {key}"));
                return None;
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                lwarn!("system", LogStage::Cache, LogComponent::Helper, "cache_get_fail", &format!("读取缓存失败，按未命中处理: {key}"), error = %e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                ldebug!("system", LogStage::Cache, LogComponent::Helper, "cache_hit", &format!("缓存命中: {key}"));
                Some(value)
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                lwarn!("system", LogStage::Cache, LogComponent::Helper, "cache_decode_fail", &format!("缓存内容无法反序列化，按未命中处理: {key}"), error = %e);
                None
            }
        }
    }

    /// 写入缓存，`ttl_seconds` 为 `None` 时使用列表默认 TTL（3600 秒）
    pub async fn set_cache<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>)
    where
        T: Serialize + ?Sized,
    {
        let ttl = self
            .ttl_policy
            .seconds(ttl_seconds.map_or(CacheTtl::Listing, CacheTtl::Custom));

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                lwarn!("system", LogStage::Cache, LogComponent::Helper, "cache_encode_fail", &format!("序列化缓存值失败: {key}"), error = %e);
                return;
            }
        };

        match self.store.set_with_expiry(key, &payload, ttl).await {
            Ok(()) => {
                ldebug!("system", LogStage::Cache, LogComponent::Helper, "cache_set", &format!("缓存已设置: {key}"), ttl_seconds = ttl);
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                lwarn!("system", LogStage::Cache, LogComponent::Helper, "cache_set_fail", &format!("设置缓存失败: {key}"), error = %e);
            }
        }
    }

    /// 删除单个键，键不存在不算错误
    pub async fn delete_cache(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(existed) => {
                ldebug!("system", LogStage::Cache, LogComponent::Helper, "cache_delete", &format!("缓存已删除: {key}"), existed = existed);
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                lwarn!("system", LogStage::Cache, LogComponent::Helper, "cache_delete_fail", &format!("删除缓存失败: {key}"), error = %e);
            }
        }
    }

    /// 删除匹配通配模式的所有键，返回删除数量；没有匹配或失败时返回 0
    pub async fn clear_cache_by_pattern(&self, pattern: &str) -> u64 {
        match self.store.delete_matching(pattern).await {
            Ok(deleted) => {
                ldebug!("system", LogStage::Cache, LogComponent::Helper, "cache_clear_pattern", &format!("按模式清理缓存: {pattern}"), deleted = deleted);
                deleted
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                lwarn!("system", LogStage::Cache, LogComponent::Helper, "cache_clear_pattern_fail", &format!("按模式清理缓存失败: {pattern}"), error = %e);
                0
            }
        }
    }

    /// 按查询形态读取
    pub async fn get<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.get_cache(&key.build()).await
    }

    /// 按查询形态写入，TTL 由键类型决定
    pub async fn set<T>(&self, key: &CacheKey, value: &T)
    where
        T: Serialize + ?Sized,
    {
        self.set_cache(&key.build(), value, Some(self.ttl_policy.for_key(key)))
            .await;
    }

    /// 按查询形态删除
    pub async fn delete(&self, key: &CacheKey) {
        self.delete_cache(&key.build()).await;
    }

    /// 读穿透：命中直接返回，未命中执行 `loader`（查询文档库）并回填
    ///
    /// `loader` 的错误原样返回，它们是文档库错误而不是缓存错误。
    pub async fn get_or_populate<T, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let raw_key = key.build();
        if let Some(value) = self.get_cache(&raw_key).await {
            return Ok(value);
        }

        let _flight = match &self.single_flight {
            Some(flights) => {
                let guard = flights.acquire(&raw_key).await;
                // 排队期间可能已被先到的请求回填
                if let Some(value) = self.peek(&raw_key).await {
                    return Ok(value);
                }
                Some(guard)
            }
            None => None,
        };

        let value = loader().await?;
        self.set(key, &value).await;
        Ok(value)
    }

    /// 单飞排队后的重查，不计入命中/未命中统计
    async fn peek<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = self.store.get(key).await.ok().flatten()?;
        let value = serde_json::from_str(&raw).ok()?;
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        self.counters.misses.fetch_sub(1, Ordering::Relaxed);
        ldebug!("system", LogStage::Cache, LogComponent::Helper, "cache_hit_after_wait", &format!("等待期间已回填: {key}"));
        Some(value)
    }

    /// 获取缓存统计信息
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.counters.hits.load(Ordering::Relaxed),
            miss_count: self.counters.misses.load(Ordering::Relaxed),
            error_count: self.counters.errors.load(Ordering::Relaxed),
            in_flight: self
                .single_flight
                .as_ref()
                .map_or(0, SingleFlight::in_flight),
            cache_type: self.store.backend(),
        }
    }
}
