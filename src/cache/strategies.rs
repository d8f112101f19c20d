//! # 缓存策略
//!
//! 定义不同查询形态的 TTL：列表与统计 1 小时，搜索结果 15 分钟

use serde::{Deserialize, Serialize};

use super::keys::CacheKey;
use crate::config::CacheConfig;

/// 缓存 TTL 策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheTtl {
    /// 列表与统计类缓存（默认 1 小时）
    Listing,
    /// 搜索结果缓存（默认 15 分钟）
    Search,
    /// 自定义 TTL（秒）
    Custom(u64),
}

impl CacheTtl {
    /// 默认列表 TTL（秒）
    pub const DEFAULT_LISTING_SECONDS: u64 = 3600;
    /// 默认搜索 TTL（秒）
    pub const DEFAULT_SEARCH_SECONDS: u64 = 900;

    /// 根据缓存键自动选择 TTL 类别
    #[must_use]
    pub const fn for_key(key: &CacheKey) -> Self {
        if key.is_search() {
            Self::Search
        } else {
            Self::Listing
        }
    }
}

/// TTL 策略，把 [`CacheTtl`] 解析成具体秒数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub listing_seconds: u64,
    pub search_seconds: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            listing_seconds: CacheTtl::DEFAULT_LISTING_SECONDS,
            search_seconds: CacheTtl::DEFAULT_SEARCH_SECONDS,
        }
    }
}

impl TtlPolicy {
    #[must_use]
    pub const fn from_config(config: &CacheConfig) -> Self {
        Self {
            listing_seconds: config.default_ttl,
            search_seconds: config.search_ttl,
        }
    }

    /// 获取TTL秒数
    #[must_use]
    pub const fn seconds(&self, ttl: CacheTtl) -> u64 {
        match ttl {
            CacheTtl::Listing => self.listing_seconds,
            CacheTtl::Search => self.search_seconds,
            CacheTtl::Custom(seconds) => seconds,
        }
    }

    /// 缓存键对应的 TTL 秒数
    #[must_use]
    pub const fn for_key(&self, key: &CacheKey) -> u64 {
        self.seconds(CacheTtl::for_key(key))
    }
}
