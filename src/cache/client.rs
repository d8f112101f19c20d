//! # Redis 缓存存储
//!
//! 基于 `ConnectionManager` 的 [`CacheStore`] 实现，断线后自动重连

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;

use super::store::CacheStore;
use crate::config::RedisConfig;
use crate::error::{Result, TrackerError};
use crate::logging::{LogComponent, LogStage};
use crate::{cache_error, ldebug, lerror, linfo};

/// Redis 缓存存储
#[derive(Clone)]
pub struct RedisStore {
    /// Redis 连接管理器
    connection_manager: ConnectionManager,
    /// 配置信息
    config: RedisConfig,
}

impl RedisStore {
    /// 连接 Redis，超过 `connection_timeout` 秒视为失败
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let target = redact_url(&config.url);
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Redis,
            "connect_to_redis",
            &format!("正在连接 Redis 服务器: {target}")
        );

        let client = Client::open(config.url.as_str())
            .map_err(|e| TrackerError::cache_with_source("创建 Redis 客户端失败", e))?;

        let timeout = Duration::from_secs(config.connection_timeout);
        let connection_manager = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                cache_error!(
                    "连接 Redis 超时: {target} ({}s)",
                    config.connection_timeout
                )
            })?
            .map_err(|e| TrackerError::cache_with_source("建立 Redis 连接失败", e))?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Redis,
            "redis_connected",
            "Redis 连接建立成功"
        );

        Ok(Self {
            connection_manager,
            config,
        })
    }

    /// 获取配置信息
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection_manager.clone();

        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| TrackerError::cache_with_source(format!("获取缓存失败: {key}"), e))?;
        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.connection_manager.clone();

        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(|e| TrackerError::cache_with_source(format!("设置缓存失败: {key}"), e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection_manager.clone();

        let deleted_count: i64 = conn
            .del(key)
            .await
            .map_err(|e| TrackerError::cache_with_source(format!("删除缓存失败: {key}"), e))?;
        Ok(deleted_count > 0)
    }

    /// 使用游标 `SCAN MATCH` 枚举，避免 `KEYS` 阻塞服务器
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection_manager.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.config.scan_count)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    TrackerError::cache_with_source(format!("扫描缓存键失败: {pattern}"), e)
                })?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN 在 rehash 期间可能重复返回同一个键
        keys.sort();
        keys.dedup();
        ldebug!(
            "system",
            LogStage::Cache,
            LogComponent::Redis,
            "scan_complete",
            &format!("扫描完成: pattern={pattern}, matched={}", keys.len())
        );
        Ok(keys)
    }

    /// 扫描后按批次 `DEL`
    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let keys = self.keys_matching(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection_manager.clone();
        let mut deleted: u64 = 0;
        for chunk in keys.chunks(self.config.scan_count.max(1)) {
            let count: u64 = conn.del(chunk).await.map_err(|e| {
                TrackerError::cache_with_source(format!("批量删除缓存失败: {pattern}"), e)
            })?;
            deleted += count;
        }
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection_manager.clone();

        let response: String = redis::Cmd::new()
            .arg("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| TrackerError::cache_with_source("Redis ping 失败", e))?;

        if response == "PONG" {
            Ok(())
        } else {
            lerror!(
                "system",
                LogStage::Cache,
                LogComponent::Redis,
                "ping_fail",
                &format!("Redis ping 响应异常: {response}")
            );
            Err(TrackerError::cache("Redis 连接测试失败"))
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// 去掉 URL 中的认证信息，只保留主机部分用于日志
fn redact_url(url: &str) -> String {
    match (url.split_once("://"), url.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://***@{host}"),
        _ => url.to_string(),
    }
}
