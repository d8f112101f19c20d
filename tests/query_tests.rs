//! # 查询处理集成测试
//!
//! 不同状态过滤的同词搜索互不串用缓存，统计与回收站随写操作刷新

use entity::application::{Changes, NewApplication, Priority, Status};
use kepler_cache::AppContext;
use kepler_cache::cache::{ApplicationFilter, CacheStore, Page};
use kepler_cache::services::count_for;
use pretty_assertions::assert_eq;

fn app(title: &str, status: Status, priority: Priority) -> NewApplication {
    NewApplication {
        title: title.to_string(),
        description: "内部系统".to_string(),
        assets: Vec::new(),
        status,
        priority,
    }
}

#[tokio::test]
async fn test_status_searches_with_same_term_stay_separate() {
    let context = AppContext::in_memory();
    let apps = &context.applications;
    apps.create(app("Portal A", Status::Todo, Priority::Low))
        .await
        .unwrap();
    apps.create(app("Portal B", Status::Production, Priority::Low))
        .await
        .unwrap();

    let todo = apps
        .search(ApplicationFilter::Status(Status::Todo), "portal")
        .await
        .unwrap();
    let production = apps
        .search(ApplicationFilter::Status(Status::Production), "portal")
        .await
        .unwrap();
    let all = apps.search(ApplicationFilter::All, "portal").await.unwrap();

    assert_eq!(todo.len(), 1);
    assert_eq!(todo[0].title, "Portal A");
    assert_eq!(production.len(), 1);
    assert_eq!(production[0].title, "Portal B");
    assert_eq!(all.len(), 2);

    let mut keys = context
        .cache_store
        .keys_matching("applications:search*")
        .await
        .unwrap();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "applications:search-production:portal",
            "applications:search-todo:portal",
            "applications:search:portal",
        ]
    );
}

#[tokio::test]
async fn test_pages_are_cached_separately() {
    let context = AppContext::in_memory();
    for i in 0..5 {
        context
            .applications
            .create(app(&format!("App {i}"), Status::Todo, Priority::Medium))
            .await
            .unwrap();
    }

    let first = context
        .applications
        .list(ApplicationFilter::All, Some(Page::new(1, 2)))
        .await
        .unwrap();
    let third = context
        .applications
        .list(ApplicationFilter::All, Some(Page::new(3, 2)))
        .await
        .unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(third.len(), 1);
    assert!(
        context
            .cache_store
            .get("applications:all:page:3:2")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_counts_and_trash_follow_writes() {
    let context = AppContext::in_memory();
    let apps = &context.applications;
    let crm = apps
        .create(app("CRM", Status::Todo, Priority::High))
        .await
        .unwrap();
    apps.create(app("ERP", Status::Testing, Priority::Low))
        .await
        .unwrap();

    let counts = apps.status_counts().await.unwrap();
    assert_eq!(count_for(&counts, Status::Todo), 1);
    assert_eq!(count_for(&counts, Status::Testing), 1);

    apps.edit(
        crm.id,
        Changes {
            status: Some(Status::Testing),
            ..Changes::default()
        },
    )
    .await
    .unwrap();
    let counts = apps.status_counts().await.unwrap();
    assert_eq!(count_for(&counts, Status::Todo), 0);
    assert_eq!(count_for(&counts, Status::Testing), 2);

    assert!(apps.trashed().await.unwrap().is_empty());
    apps.trash(crm.id).await.unwrap();
    assert_eq!(apps.trashed().await.unwrap().len(), 1);
    let priorities = apps.priority_counts().await.unwrap();
    assert_eq!(priorities.len(), 1);
    assert_eq!(priorities[0].id, "Low");

    apps.restore(crm.id).await.unwrap();
    assert!(apps.trashed().await.unwrap().is_empty());
}
