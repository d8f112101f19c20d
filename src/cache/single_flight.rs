//! # 单飞（single-flight）去重
//!
//! 同一个键的并发未命中排队在一把按键分配的异步锁后面。
//! 第一个拿到锁的请求查询文档库并回填缓存，后续请求拿到锁后先重查缓存，
//! 通常直接命中，不再访问文档库。

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 按键分配的飞行锁表
#[derive(Debug, Default, Clone)]
pub struct SingleFlight {
    inflight: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取键的飞行锁，返回的守卫释放时清理无人等待的表项
    pub async fn acquire(&self, key: &str) -> FlightGuard {
        let lock = Arc::clone(&self.inflight.entry(key.to_string()).or_default());
        let guard = lock.lock_owned().await;
        FlightGuard {
            key: key.to_string(),
            inflight: Arc::clone(&self.inflight),
            _guard: guard,
        }
    }

    /// 当前持有或等待中的键数量
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}

/// 飞行锁守卫
pub struct FlightGuard {
    key: String,
    inflight: Arc<DashMap<String, Arc<Mutex<()>>>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // 表自身一份 + 本守卫一份；更多引用说明还有请求在等待
        self.inflight
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_cleans_up_entry() {
        let flights = SingleFlight::new();
        {
            let _guard = flights.acquire("users:all").await;
            assert_eq!(flights.in_flight(), 1);
        }
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let flights = SingleFlight::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = flights.clone();
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            handles.push(tokio::spawn(async move {
                let _guard = flights.acquire("applications:all").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let flights = SingleFlight::new();
        let _a = flights.acquire("users:all").await;
        let b = tokio::time::timeout(Duration::from_millis(100), flights.acquire("users:count")).await;
        assert!(b.is_ok());
    }
}
