//! # 并发读取测试
//!
//! 冷缓存上的并发未命中：默认各自查询文档库，最后写入者胜出；
//! 开启单飞后同一个键只查询一次

mod common;

use common::{CountingUserStore, new_user};
use entity::user::Profile;
use kepler_cache::cache::{CacheHelper, CacheStore, InvalidationCoordinator, MemoryStore};
use kepler_cache::services::UserService;
use kepler_cache::store::{MemoryApplicationStore, UserStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    service: UserService,
    users: CountingUserStore,
    cache: Arc<MemoryStore>,
}

async fn fixture(single_flight: bool) -> Fixture {
    kepler_cache::logging::init_test_logging();
    let cache = Arc::new(MemoryStore::new(1_000));
    let users = CountingUserStore::with_delay(Duration::from_millis(30));
    for name in ["alice", "bob"] {
        users
            .create(entity::User::from_new(new_user(name)))
            .await
            .unwrap();
    }

    let service = UserService::new(
        Arc::new(users.clone()),
        Arc::new(MemoryApplicationStore::new()),
        CacheHelper::new(cache.clone()).with_single_flight(single_flight),
        InvalidationCoordinator::new(cache.clone()),
    );
    Fixture {
        service,
        users,
        cache,
    }
}

#[tokio::test]
async fn test_concurrent_cold_reads_both_query_and_agree() {
    let f = fixture(false).await;

    let (a, b) = tokio::join!(f.service.list(None), f.service.list(None));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(f.users.finds(), 2);
    assert_eq!(a, b);

    let raw = f.cache.get("users:all").await.unwrap().unwrap();
    let cached: Vec<Profile> = serde_json::from_str(&raw).unwrap();
    assert_eq!(cached, a);

    // 回填之后不再访问文档库
    f.service.list(None).await.unwrap();
    assert_eq!(f.users.finds(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_flight_serves_all_waiters_with_one_query() {
    let f = fixture(true).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = f.service.clone();
        handles.push(tokio::spawn(async move { service.list(None).await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(f.users.finds(), 1);
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(results[0].len(), 2);
}

#[tokio::test]
async fn test_single_flight_does_not_merge_different_keys() {
    let f = fixture(true).await;

    let (all, search) = tokio::join!(f.service.list(None), f.service.search("ali"));

    assert_eq!(all.unwrap().len(), 2);
    assert_eq!(search.unwrap().len(), 1);
    assert_eq!(f.users.finds(), 2);
}
