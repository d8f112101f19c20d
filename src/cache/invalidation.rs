//! # 缓存失效协调
//!
//! 写操作提交成功后，按聚合清除其失效组：固定键逐个删除，通配模式扫描后删除。
//! 组内所有删除并发发出，任何一个失败都不会中断其他删除。

use futures::future::{BoxFuture, join_all};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::keys::{ApplicationFilter, CacheKey, CacheKeyBuilder};
use super::store::CacheStore;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};

/// 失效的聚合类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Aggregate {
    Application,
    User,
}

impl Aggregate {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一个聚合变更后必须一起清除的键与模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationGroup {
    pub aggregate: Aggregate,
    /// 直接删除的固定键
    pub keys: Vec<String>,
    /// 扫描后删除的通配模式
    pub patterns: Vec<String>,
}

impl InvalidationGroup {
    /// 聚合对应的失效组
    ///
    /// 应用变更会影响所有状态列表（含分页）、所有搜索类型、统计、
    /// 每人参与数和回收站；用户变更影响用户列表（含分页）、用户搜索和用户总数。
    #[must_use]
    pub fn for_aggregate(aggregate: Aggregate) -> Self {
        match aggregate {
            Aggregate::Application => {
                let mut keys: Vec<String> = ApplicationFilter::ALL
                    .into_iter()
                    .map(|filter| CacheKeyBuilder::applications(filter).build())
                    .collect();
                keys.extend(
                    [
                        CacheKeyBuilder::status_count(),
                        CacheKeyBuilder::priority_count(),
                        CacheKeyBuilder::user_applications_count(),
                        CacheKeyBuilder::trashed_applications(),
                    ]
                    .iter()
                    .map(CacheKey::build),
                );

                let mut patterns: Vec<String> = ApplicationFilter::ALL
                    .into_iter()
                    .map(|filter| CacheKeyBuilder::applications(filter).pattern())
                    .collect();
                patterns.extend(
                    ApplicationFilter::ALL
                        .into_iter()
                        .map(|filter| CacheKeyBuilder::application_search(filter, "").pattern()),
                );

                Self {
                    aggregate,
                    keys,
                    patterns,
                }
            }
            Aggregate::User => Self {
                aggregate,
                keys: vec![
                    CacheKeyBuilder::users(None).build(),
                    CacheKeyBuilder::user_count().build(),
                ],
                patterns: vec![
                    CacheKeyBuilder::users(None).pattern(),
                    CacheKeyBuilder::user_search("").pattern(),
                ],
            },
        }
    }

    /// 组内删除操作总数
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len() + self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 缓存键是否会被本组清除
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        let raw = key.build();
        self.keys.iter().any(|fixed| *fixed == raw)
            || self.patterns.iter().any(|pattern| {
                super::store::glob_to_regex(pattern).is_ok_and(|re| re.is_match(&raw))
            })
    }
}

/// 一次失效的执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub aggregate: Option<Aggregate>,
    /// 发出的删除操作数
    pub operations: usize,
    /// 实际删除的键数
    pub deleted: u64,
    /// 失败的操作（键或模式）
    pub failed: Vec<String>,
}

impl InvalidationReport {
    /// 所有删除操作都成功
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: Self) {
        self.operations += other.operations;
        self.deleted += other.deleted;
        self.failed.extend(other.failed);
    }
}

enum Outcome {
    Deleted(u64),
    Failed(String),
}

/// 失效协调器
#[derive(Clone)]
pub struct InvalidationCoordinator {
    store: Arc<dyn CacheStore>,
}

impl InvalidationCoordinator {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// 清除聚合的整个失效组
    ///
    /// 失败只记录日志并写入报告，不向调用方返回错误：
    /// 未清除的条目最多在其 TTL 内陈旧。
    pub async fn invalidate(&self, aggregate: Aggregate) -> InvalidationReport {
        let group = InvalidationGroup::for_aggregate(aggregate);
        let mut ops: Vec<BoxFuture<'_, Outcome>> = Vec::with_capacity(group.len());

        for key in &group.keys {
            ops.push(Box::pin(async move {
                match self.store.delete(key).await {
                    Ok(existed) => Outcome::Deleted(u64::from(existed)),
                    Err(e) => {
                        lwarn!("system", LogStage::Invalidation, LogComponent::Invalidator, "delete_key_fail", &format!("删除缓存键失败: {key}"), aggregate = %aggregate, error = %e);
                        Outcome::Failed(key.clone())
                    }
                }
            }));
        }

        for pattern in &group.patterns {
            ops.push(Box::pin(async move {
                match self.store.delete_matching(pattern).await {
                    Ok(deleted) => Outcome::Deleted(deleted),
                    Err(e) => {
                        lwarn!("system", LogStage::Invalidation, LogComponent::Invalidator, "delete_pattern_fail", &format!("按模式删除缓存失败: {pattern}"), aggregate = %aggregate, error = %e);
                        Outcome::Failed(pattern.clone())
                    }
                }
            }));
        }

        let mut report = InvalidationReport {
            aggregate: Some(aggregate),
            operations: ops.len(),
            ..InvalidationReport::default()
        };
        for outcome in join_all(ops).await {
            match outcome {
                Outcome::Deleted(count) => report.deleted += count,
                Outcome::Failed(target) => report.failed.push(target),
            }
        }

        if report.is_complete() {
            ldebug!("system", LogStage::Invalidation, LogComponent::Invalidator, "invalidate", &format!("{aggregate} 缓存已清除"), deleted = report.deleted, operations = report.operations);
        } else {
            lwarn!("system", LogStage::Invalidation, LogComponent::Invalidator, "invalidate_partial", &format!("{aggregate} 缓存部分清除失败，残留条目将在 TTL 后过期"), deleted = report.deleted, failed = report.failed.len());
        }
        report
    }

    /// 清除应用相关的全部缓存
    pub async fn clear_application_cache(&self) -> InvalidationReport {
        self.invalidate(Aggregate::Application).await
    }

    /// 清除用户相关的全部缓存
    pub async fn clear_user_cache(&self) -> InvalidationReport {
        self.invalidate(Aggregate::User).await
    }

    /// 依次清除多个聚合，合并报告
    pub async fn invalidate_all(&self, aggregates: &[Aggregate]) -> InvalidationReport {
        let reports = join_all(aggregates.iter().map(|aggregate| self.invalidate(*aggregate))).await;
        let mut merged = InvalidationReport {
            aggregate: aggregates.first().copied().filter(|_| aggregates.len() == 1),
            ..InvalidationReport::default()
        };
        for report in reports {
            merged.merge(report);
        }
        merged
    }

    /// 先执行文档库写入，成功后再清除缓存
    ///
    /// 写入失败时不触碰缓存，直接返回写入错误；失效失败不影响写入结果。
    pub async fn commit_then_invalidate<T, Fut>(
        &self,
        aggregates: &[Aggregate],
        write: Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let value = write.await?;
        let report = self.invalidate_all(aggregates).await;
        if !report.is_complete() {
            linfo!("system", LogStage::Mutation, LogComponent::Invalidator, "commit_with_stale_cache", "写入已提交，部分缓存未能清除", failed = ?report.failed);
        }
        Ok(value)
    }
}
