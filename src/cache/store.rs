//! # 缓存存储抽象层
//!
//! 远程键值存储的最小契约：带过期时间的读写、删除、按通配模式枚举，
//! 以及基于 moka 的进程内实现。

use async_trait::async_trait;
use futures::future::join_all;
use moka::Expiry;
use moka::future::Cache;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache_error;
use crate::error::{Result, TrackerError};

/// 缓存存储适配器
///
/// 实现只负责把存储层的错误如实返回；吞掉错误、降级为未命中是
/// [`CacheHelper`](super::helper::CacheHelper) 的职责。
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取原始值，不存在或已过期返回 `None`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入值并设置过期时间（秒），覆盖已有值
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// 删除单个键，返回键是否存在
    async fn delete(&self, key: &str) -> Result<bool>;

    /// 枚举匹配通配模式（Redis glob 语义）的所有键
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>>;

    /// 删除匹配通配模式的所有键，返回删除数量
    ///
    /// 单个键删除失败不会中断其余删除，全部尝试后再报告失败。
    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let keys = self.keys_matching(pattern).await?;
        let results = join_all(keys.iter().map(|key| self.delete(key))).await;

        let mut deleted = 0;
        let mut failed = 0usize;
        for result in results {
            match result {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(_) => failed += 1,
            }
        }

        if failed > 0 {
            return Err(cache_error!(
                "按模式删除部分失败: pattern={pattern}, deleted={deleted}, failed={failed}"
            ));
        }
        Ok(deleted)
    }

    /// 测试连接
    async fn ping(&self) -> Result<()>;

    /// 存储类型名称，用于日志与统计
    fn backend(&self) -> &'static str;
}

/// 把 Redis glob 模式转换为锚定的正则表达式
///
/// 支持 `*`、`?`、`[...]`（含 `[^...]` 与区间）和 `\` 转义。
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut out = String::with_capacity(pattern.len() * 2 + 6);
    out.push_str("(?s)^");
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => push_literal(&mut out, escaped),
                None => push_literal(&mut out, '\\'),
            },
            '[' => {
                let mut class = String::from("[");
                let mut closed = false;
                let mut first = true;
                while let Some(cc) = chars.next() {
                    match cc {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '^' if first => class.push('^'),
                        '-' => class.push('-'),
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                push_literal(&mut class, escaped);
                            }
                        }
                        other => push_literal(&mut class, other),
                    }
                    first = false;
                }
                if !closed {
                    return Err(cache_error!("无效的匹配模式，缺少 ']': {pattern}"));
                }
                class.push(']');
                out.push_str(&class);
            }
            other => push_literal(&mut out, other),
        }
    }
    out.push('$');

    Regex::new(&out)
        .map_err(|e| TrackerError::cache_with_source(format!("无效的匹配模式: {pattern}"), e))
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// 进程内存储的条目，携带自身 TTL
#[derive(Debug, Clone)]
struct StoredValue {
    payload: Arc<str>,
    ttl: Duration,
}

/// 按条目 TTL 过期，覆盖写入时重新计时
struct PerEntryExpiry;

impl Expiry<String, StoredValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 基于 moka 的进程内缓存存储
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, StoredValue>,
}

impl MemoryStore {
    /// 创建指定容量的内存存储
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .name("kepler-cache")
            .max_capacity(max_entries)
            .expire_after(PerEntryExpiry)
            .build();
        Self { entries }
    }

    /// 当前条目数（近似值）
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).await.map(|v| v.payload.to_string()))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        if ttl_seconds == 0 {
            return Err(cache_error!("无效的过期时间: key={key}, ttl=0"));
        }

        let stored = StoredValue {
            payload: Arc::from(value),
            ttl: Duration::from_secs(ttl_seconds),
        };
        self.entries.insert(key.to_string(), stored).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).await.is_some())
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = glob_to_regex(pattern)?;
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| matcher.is_match(key))
            .map(|(key, _)| key.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// 不可用的缓存存储
///
/// 启动时无法连接缓存服务器时使用：所有操作都返回缓存错误，
/// 由 [`CacheHelper`](super::helper::CacheHelper) 降级为未命中，业务照常访问文档库。
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: Arc<str>,
}

impl UnavailableStore {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Arc::from(reason.into()),
        }
    }

    fn fail<T>(&self, operation: &str) -> Result<T> {
        Err(cache_error!("缓存存储不可用 ({operation}): {}", self.reason))
    }
}

#[async_trait]
impl CacheStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        self.fail("get")
    }

    async fn set_with_expiry(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> Result<()> {
        self.fail("set")
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        self.fail("delete")
    }

    async fn keys_matching(&self, _pattern: &str) -> Result<Vec<String>> {
        self.fail("scan")
    }

    async fn ping(&self) -> Result<()> {
        self.fail("ping")
    }

    fn backend(&self) -> &'static str {
        "unavailable"
    }
}
