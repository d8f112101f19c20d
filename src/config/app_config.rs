//! # 应用配置结构定义

use serde::{Deserialize, Serialize};

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,
    /// 日志级别（`RUST_LOG` 未设置时生效）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// 缓存类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// 进程内缓存
    #[default]
    Memory,
    /// Redis缓存
    Redis,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 缓存类型
    pub cache_type: CacheType,
    /// 内存缓存最大条目数
    pub memory_max_entries: u64,
    /// 列表和统计类缓存的默认过期时间（秒）
    pub default_ttl: u64,
    /// 搜索结果缓存的过期时间（秒）
    pub search_ttl: u64,
    /// 同一个键并发未命中时只查询一次文档库
    pub single_flight: bool,
    /// Redis 缓存配置
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::Memory,
            memory_max_entries: 10_000,
            default_ttl: 3600,
            search_ttl: 900,
            single_flight: false,
            redis: None,
        }
    }
}

/// Redis配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis连接URL
    pub url: String,
    /// 连接超时时间（秒）
    pub connection_timeout: u64,
    /// SCAN 每批次返回的键数量提示
    pub scan_count: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            connection_timeout: 10,
            scan_count: 100,
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> crate::error::Result<()> {
        crate::ensure_config!(self.cache.default_ttl > 0, "cache.default_ttl 必须大于0");
        crate::ensure_config!(self.cache.search_ttl > 0, "cache.search_ttl 必须大于0");

        match self.cache.cache_type {
            CacheType::Memory => {
                crate::ensure_config!(
                    self.cache.memory_max_entries > 0,
                    "cache.memory_max_entries 必须大于0"
                );
            }
            CacheType::Redis => {
                let redis = self.cache.redis.as_ref().ok_or_else(|| {
                    crate::config_error!("cache_type = \"redis\" 时必须提供 cache.redis 配置")
                })?;

                crate::ensure_config!(!redis.url.is_empty(), "Redis URL不能为空");
                crate::ensure_config!(
                    redis.url.starts_with("redis://") || redis.url.starts_with("rediss://"),
                    "无效的 Redis URL: {}",
                    redis.url
                );
                crate::ensure_config!(
                    redis.connection_timeout > 0,
                    "Redis 连接超时必须大于0"
                );
            }
        }

        Ok(())
    }
}
