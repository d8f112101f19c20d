//! # 失效协调集成测试
//!
//! 写操作后失效组完整清除、部分失败时其余删除照常完成、
//! 以及写入后下一次读取重新回填

mod common;

use common::{FlakyStore, new_user, shared};
use entity::application::{NewApplication, Priority, Status};
use kepler_cache::AppContext;
use kepler_cache::app::DocumentStores;
use kepler_cache::cache::{
    Aggregate, ApplicationFilter, CacheHelper, CacheKey, CacheKeyBuilder, CacheStore,
    InvalidationCoordinator, InvalidationGroup, MemoryStore,
};
use kepler_cache::config::AppConfig;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn crm() -> NewApplication {
    NewApplication {
        title: "CRM Portal".to_string(),
        description: "客户关系管理".to_string(),
        assets: Vec::new(),
        status: Status::Todo,
        priority: Priority::High,
    }
}

/// 应用失效组覆盖的所有查询形态（含分页和各类搜索）
fn application_shapes() -> Vec<CacheKey> {
    let mut keys = Vec::new();
    for filter in ApplicationFilter::ALL {
        keys.push(CacheKeyBuilder::applications(filter));
        keys.push(CacheKeyBuilder::applications_page(filter, 1, 20));
        keys.push(CacheKeyBuilder::application_search(filter, "crm"));
    }
    keys.extend([
        CacheKeyBuilder::status_count(),
        CacheKeyBuilder::priority_count(),
        CacheKeyBuilder::user_applications_count(),
        CacheKeyBuilder::trashed_applications(),
    ]);
    keys
}

fn user_shapes() -> Vec<CacheKey> {
    vec![
        CacheKeyBuilder::users(None),
        CacheKeyBuilder::users(Some(kepler_cache::cache::Page::new(2, 10))),
        CacheKeyBuilder::user_search("ali"),
        CacheKeyBuilder::user_count(),
    ]
}

async fn seed(store: &dyn CacheStore, keys: &[CacheKey]) {
    for key in keys {
        store.set_with_expiry(&key.build(), "[]", 3600).await.unwrap();
    }
}

#[tokio::test]
async fn test_application_mutation_clears_whole_group() {
    let cache = Arc::new(MemoryStore::new(1_000));
    let context = AppContext::new(AppConfig::default(), cache.clone(), DocumentStores::in_memory());
    seed(cache.as_ref(), &application_shapes()).await;
    seed(cache.as_ref(), &user_shapes()).await;

    context.applications.create(crm()).await.unwrap();

    for key in application_shapes() {
        assert_eq!(cache.get(&key.build()).await.unwrap(), None, "{key} 未被清除");
    }
    // 用户组不受应用变更影响
    for key in user_shapes() {
        assert!(cache.get(&key.build()).await.unwrap().is_some(), "{key} 被误删");
    }
}

#[tokio::test]
async fn test_user_mutation_clears_whole_group() {
    let cache = Arc::new(MemoryStore::new(1_000));
    let context = AppContext::new(AppConfig::default(), cache.clone(), DocumentStores::in_memory());
    seed(cache.as_ref(), &user_shapes()).await;
    seed(cache.as_ref(), &[CacheKeyBuilder::status_count()]).await;

    context.users.register(new_user("alice")).await.unwrap();

    for key in user_shapes() {
        assert_eq!(cache.get(&key.build()).await.unwrap(), None, "{key} 未被清除");
    }
    assert!(
        cache
            .get("applications:status-count")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_every_group_member_is_reported() {
    for aggregate in [Aggregate::Application, Aggregate::User] {
        let group = InvalidationGroup::for_aggregate(aggregate);
        let shapes = match aggregate {
            Aggregate::Application => application_shapes(),
            Aggregate::User => user_shapes(),
        };
        for key in shapes {
            assert!(group.contains(&key), "{aggregate} 组缺少 {key}");
        }
    }
}

#[tokio::test]
async fn test_partial_failure_does_not_stop_other_deletes() {
    let store = Arc::new(FlakyStore::failing_on(&[
        "applications:status-count",
        "applications:search-todo:*",
    ]));
    seed(&store.inner, &application_shapes()).await;

    let coordinator = InvalidationCoordinator::new(store.clone());
    let report = coordinator.clear_application_cache().await;

    assert!(!report.is_complete());
    let mut failed = report.failed.clone();
    failed.sort();
    assert_eq!(
        failed,
        vec!["applications:search-todo:*", "applications:status-count"]
    );

    for key in application_shapes() {
        let raw = key.build();
        let survived = store.inner.get(&raw).await.unwrap().is_some();
        let expected = raw == "applications:status-count" || raw.starts_with("applications:search-todo:");
        assert_eq!(survived, expected, "{raw}");
    }
}

#[tokio::test]
async fn test_write_succeeds_even_when_invalidation_fails() {
    let store = shared(FlakyStore::failing_on(&["applications:all"]));
    let context = AppContext::new(AppConfig::default(), store, DocumentStores::in_memory());

    let created = context.applications.create(crm()).await.unwrap();
    assert_eq!(created.title, "CRM Portal");
}

#[tokio::test]
async fn test_create_then_list_repopulates_with_new_application() {
    let cache = Arc::new(MemoryStore::new(1_000));
    let context = AppContext::new(AppConfig::default(), cache.clone(), DocumentStores::in_memory());

    assert!(context.applications.list(ApplicationFilter::All, None).await.unwrap().is_empty());
    assert!(cache.get("applications:all").await.unwrap().is_some());

    let created = context.applications.create(crm()).await.unwrap();
    assert_eq!(cache.get("applications:all").await.unwrap(), None);

    let listed = context.applications.list(ApplicationFilter::All, None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    let helper = CacheHelper::new(cache.clone());
    let cached: Vec<entity::Application> = helper
        .get(&CacheKeyBuilder::applications(ApplicationFilter::All))
        .await
        .unwrap();
    assert_eq!(cached, listed);
}

#[tokio::test]
async fn test_invalidation_twice_is_harmless() {
    let coordinator = InvalidationCoordinator::new(shared(MemoryStore::new(100)));
    for _ in 0..2 {
        assert!(coordinator.clear_user_cache().await.is_complete());
        assert!(coordinator.clear_application_cache().await.is_complete());
    }
}
