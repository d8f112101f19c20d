//! # 缓存键命名规范
//!
//! 查询形态（实体 × 过滤条件 × 分页 / 搜索词）到缓存键字符串的确定性映射。
//!
//! | 键 | 形态 |
//! |---|---|
//! | `applications:<qualifier>` | 应用列表，qualifier 为 `all`/`todo`/`implement`/`test`/`production` |
//! | `applications:<qualifier>:page:<page>:<limit>` | 分页的应用列表 |
//! | `applications:<search-kind>:<term>` | 应用搜索，search-kind 为 `search` 或 `search-<qualifier>` |
//! | `applications:status-count` / `applications:priority-count` | 统计 |
//! | `users:applications-count` | 每个成员参与的应用数 |
//! | `TrashApplication:all` | 回收站列表 |
//! | `users:all[:page:<page>:<limit>]` / `users:search:<term>` / `users:count` | 用户 |
//!
//! 搜索词原样嵌入键中（不做哈希），不同的搜索词总是得到不同的键。

use entity::application::Status;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 缓存键命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Applications,
    Users,
    TrashApplication,
}

impl Namespace {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applications => "applications",
            Self::Users => "users",
            Self::TrashApplication => "TrashApplication",
        }
    }
}

/// 应用列表/搜索的状态过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationFilter {
    /// 所有未删除的应用
    All,
    /// 指定状态的应用
    Status(Status),
}

impl ApplicationFilter {
    /// 所有过滤条件
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::Status(Status::Todo),
        Self::Status(Status::Implement),
        Self::Status(Status::Testing),
        Self::Status(Status::Production),
    ];

    /// 列表键中的限定词
    #[must_use]
    pub const fn qualifier(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Status(Status::Todo) => "todo",
            Self::Status(Status::Implement) => "implement",
            Self::Status(Status::Testing) => "test",
            Self::Status(Status::Production) => "production",
        }
    }

    /// 搜索键中的搜索类型
    #[must_use]
    pub const fn search_kind(self) -> &'static str {
        match self {
            Self::All => "search",
            Self::Status(Status::Todo) => "search-todo",
            Self::Status(Status::Implement) => "search-implement",
            Self::Status(Status::Testing) => "search-test",
            Self::Status(Status::Production) => "search-production",
        }
    }

    /// 过滤对应的状态，`All` 不限制
    #[must_use]
    pub const fn status(self) -> Option<Status> {
        match self {
            Self::All => None,
            Self::Status(status) => Some(status),
        }
    }

    fn from_qualifier(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.qualifier() == value)
    }

    fn from_search_kind(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.search_kind() == value)
    }
}

/// 分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    /// 从 1 开始的页码
    pub page: u32,
    /// 每页条数
    pub limit: u32,
}

impl Page {
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// 跳过的条数
    #[must_use]
    pub const fn offset(self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }

    fn suffix(self) -> String {
        format!("page:{}:{}", self.page, self.limit)
    }

    fn parse(raw: &str) -> Option<Self> {
        let (page, limit) = raw.strip_prefix("page:")?.split_once(':')?;
        Some(Self {
            page: page.parse().ok()?,
            limit: limit.parse().ok()?,
        })
    }
}

/// 缓存键类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKey {
    /// 应用列表 - `applications:{qualifier}[:page:{page}:{limit}]`
    ApplicationList {
        filter: ApplicationFilter,
        page: Option<Page>,
    },

    /// 应用搜索 - `applications:{search_kind}:{term}`
    ApplicationSearch {
        filter: ApplicationFilter,
        term: String,
    },

    /// 按状态统计 - `applications:status-count`
    ApplicationStatusCount,

    /// 按优先级统计 - `applications:priority-count`
    ApplicationPriorityCount,

    /// 每个成员参与的应用数 - `users:applications-count`
    UserApplicationsCount,

    /// 回收站 - `TrashApplication:all`
    TrashedApplications,

    /// 用户列表 - `users:all[:page:{page}:{limit}]`
    UserList { page: Option<Page> },

    /// 用户搜索 - `users:search:{term}`
    UserSearch { term: String },

    /// 用户总数 - `users:count`
    UserCount,
}

impl CacheKey {
    /// 生成缓存键字符串
    #[must_use]
    pub fn build(&self) -> String {
        let ns = self.namespace().as_str();
        match self {
            Self::ApplicationList { filter, page } => match page {
                Some(page) => format!("{ns}:{}:{}", filter.qualifier(), page.suffix()),
                None => format!("{ns}:{}", filter.qualifier()),
            },
            Self::ApplicationSearch { filter, term } => {
                format!("{ns}:{}:{term}", filter.search_kind())
            }
            Self::ApplicationStatusCount => format!("{ns}:status-count"),
            Self::ApplicationPriorityCount => format!("{ns}:priority-count"),
            Self::UserApplicationsCount => format!("{ns}:applications-count"),
            Self::TrashedApplications => format!("{ns}:all"),
            Self::UserList { page } => match page {
                Some(page) => format!("{ns}:all:{}", page.suffix()),
                None => format!("{ns}:all"),
            },
            Self::UserSearch { term } => format!("{ns}:search:{term}"),
            Self::UserCount => format!("{ns}:count"),
        }
    }

    /// 获取缓存键所属家族的通配模式（用于批量删除）
    ///
    /// 列表键返回其分页变体的模式，搜索键返回同类搜索的模式，
    /// 统计键没有变体，返回键本身。
    #[must_use]
    pub fn pattern(&self) -> String {
        let ns = self.namespace().as_str();
        match self {
            Self::ApplicationList { filter, .. } => format!("{ns}:{}:page:*", filter.qualifier()),
            Self::ApplicationSearch { filter, .. } => format!("{ns}:{}:*", filter.search_kind()),
            Self::UserList { .. } => format!("{ns}:all:page:*"),
            Self::UserSearch { .. } => format!("{ns}:search:*"),
            Self::ApplicationStatusCount
            | Self::ApplicationPriorityCount
            | Self::UserApplicationsCount
            | Self::TrashedApplications
            | Self::UserCount => self.build(),
        }
    }

    /// 获取缓存键的命名空间
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        match self {
            Self::ApplicationList { .. }
            | Self::ApplicationSearch { .. }
            | Self::ApplicationStatusCount
            | Self::ApplicationPriorityCount => Namespace::Applications,
            Self::UserApplicationsCount
            | Self::UserList { .. }
            | Self::UserSearch { .. }
            | Self::UserCount => Namespace::Users,
            Self::TrashedApplications => Namespace::TrashApplication,
        }
    }

    /// 是否是搜索结果缓存（需要较短的 TTL）
    #[must_use]
    pub const fn is_search(&self) -> bool {
        matches!(self, Self::ApplicationSearch { .. } | Self::UserSearch { .. })
    }

    /// 从缓存键字符串还原查询形态，不属于本命名规范的键返回 `None`
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (ns, rest) = raw.split_once(':')?;
        match ns {
            "applications" => Self::parse_applications(rest),
            "users" => Self::parse_users(rest),
            "TrashApplication" => (rest == "all").then_some(Self::TrashedApplications),
            _ => None,
        }
    }

    fn parse_applications(rest: &str) -> Option<Self> {
        match rest {
            "status-count" => return Some(Self::ApplicationStatusCount),
            "priority-count" => return Some(Self::ApplicationPriorityCount),
            _ => {}
        }

        let (head, tail) = split_head(rest);
        if let Some(filter) = ApplicationFilter::from_search_kind(head) {
            return Some(Self::ApplicationSearch {
                filter,
                term: tail?.to_string(),
            });
        }

        let filter = ApplicationFilter::from_qualifier(head)?;
        let page = match tail {
            Some(tail) => Some(Page::parse(tail)?),
            None => None,
        };
        Some(Self::ApplicationList { filter, page })
    }

    fn parse_users(rest: &str) -> Option<Self> {
        match rest {
            "applications-count" => return Some(Self::UserApplicationsCount),
            "count" => return Some(Self::UserCount),
            _ => {}
        }

        match split_head(rest) {
            ("all", None) => Some(Self::UserList { page: None }),
            ("all", Some(tail)) => Some(Self::UserList {
                page: Some(Page::parse(tail)?),
            }),
            ("search", Some(term)) => Some(Self::UserSearch {
                term: term.to_string(),
            }),
            _ => None,
        }
    }
}

fn split_head(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once(':') {
        Some((head, tail)) => (head, Some(tail)),
        None => (rest, None),
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build())
    }
}

/// 缓存键构建器
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// 构建应用列表缓存键
    #[must_use]
    pub const fn applications(filter: ApplicationFilter) -> CacheKey {
        CacheKey::ApplicationList { filter, page: None }
    }

    /// 构建分页应用列表缓存键
    #[must_use]
    pub const fn applications_page(filter: ApplicationFilter, page: u32, limit: u32) -> CacheKey {
        CacheKey::ApplicationList {
            filter,
            page: Some(Page::new(page, limit)),
        }
    }

    /// 构建应用搜索缓存键
    #[must_use]
    pub fn application_search(filter: ApplicationFilter, term: &str) -> CacheKey {
        CacheKey::ApplicationSearch {
            filter,
            term: term.to_string(),
        }
    }

    #[must_use]
    pub const fn status_count() -> CacheKey {
        CacheKey::ApplicationStatusCount
    }

    #[must_use]
    pub const fn priority_count() -> CacheKey {
        CacheKey::ApplicationPriorityCount
    }

    #[must_use]
    pub const fn user_applications_count() -> CacheKey {
        CacheKey::UserApplicationsCount
    }

    #[must_use]
    pub const fn trashed_applications() -> CacheKey {
        CacheKey::TrashedApplications
    }

    /// 构建用户列表缓存键
    #[must_use]
    pub const fn users(page: Option<Page>) -> CacheKey {
        CacheKey::UserList { page }
    }

    /// 构建用户搜索缓存键
    #[must_use]
    pub fn user_search(term: &str) -> CacheKey {
        CacheKey::UserSearch {
            term: term.to_string(),
        }
    }

    #[must_use]
    pub const fn user_count() -> CacheKey {
        CacheKey::UserCount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn test_cache_key_build() {
        assert_eq!(
            CacheKeyBuilder::applications(ApplicationFilter::All).build(),
            "applications:all"
        );
        assert_eq!(
            CacheKeyBuilder::applications(ApplicationFilter::Status(Status::Todo)).build(),
            "applications:todo"
        );
        assert_eq!(
            CacheKeyBuilder::applications(ApplicationFilter::Status(Status::Testing)).build(),
            "applications:test"
        );
        assert_eq!(
            CacheKeyBuilder::applications_page(ApplicationFilter::All, 2, 20).build(),
            "applications:all:page:2:20"
        );
        assert_eq!(
            CacheKeyBuilder::status_count().build(),
            "applications:status-count"
        );
        assert_eq!(
            CacheKeyBuilder::user_applications_count().build(),
            "users:applications-count"
        );
        assert_eq!(
            CacheKeyBuilder::trashed_applications().build(),
            "TrashApplication:all"
        );
        assert_eq!(CacheKeyBuilder::users(None).build(), "users:all");
        assert_eq!(CacheKeyBuilder::user_count().build(), "users:count");
    }

    #[test]
    fn test_search_term_is_embedded_verbatim() {
        let key = CacheKeyBuilder::application_search(ApplicationFilter::All, "Pay Roll:v2*");
        assert_eq!(key.build(), "applications:search:Pay Roll:v2*");

        let key = CacheKeyBuilder::user_search("alice");
        assert_eq!(key.build(), "users:search:alice");
    }

    #[test]
    fn test_status_searches_do_not_share_a_key() {
        let keys: Vec<String> = ApplicationFilter::ALL
            .into_iter()
            .map(|filter| CacheKeyBuilder::application_search(filter, "portal").build())
            .collect();

        assert_eq!(
            keys,
            vec![
                "applications:search:portal",
                "applications:search-todo:portal",
                "applications:search-implement:portal",
                "applications:search-test:portal",
                "applications:search-production:portal",
            ]
        );
    }

    #[test]
    fn test_cache_key_pattern() {
        let key = CacheKeyBuilder::application_search(ApplicationFilter::Status(Status::Todo), "x");
        assert_eq!(key.pattern(), "applications:search-todo:*");

        let key = CacheKeyBuilder::applications(ApplicationFilter::All);
        assert_eq!(key.pattern(), "applications:all:page:*");

        assert_eq!(
            CacheKeyBuilder::priority_count().pattern(),
            "applications:priority-count"
        );
    }

    #[test]
    fn test_cache_key_namespace() {
        assert_eq!(
            CacheKeyBuilder::user_applications_count().namespace(),
            Namespace::Users
        );
        assert_eq!(
            CacheKeyBuilder::trashed_applications().namespace(),
            Namespace::TrashApplication
        );
        assert!(CacheKeyBuilder::user_search("bob").is_search());
        assert!(!CacheKeyBuilder::user_count().is_search());
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert_eq!(CacheKey::parse("sess:abc"), None);
        assert_eq!(CacheKey::parse("applications:archived"), None);
        assert_eq!(CacheKey::parse("applications:search"), None);
        assert_eq!(CacheKey::parse("users:all:page:x:1"), None);
        assert_eq!(CacheKey::parse("TrashApplication:todo"), None);
    }

    #[test]
    fn test_fixed_keys_are_distinct() {
        let mut seen = HashMap::new();
        let mut fixed: Vec<CacheKey> = ApplicationFilter::ALL
            .into_iter()
            .map(CacheKeyBuilder::applications)
            .collect();
        fixed.extend([
            CacheKeyBuilder::status_count(),
            CacheKeyBuilder::priority_count(),
            CacheKeyBuilder::user_applications_count(),
            CacheKeyBuilder::trashed_applications(),
            CacheKeyBuilder::users(None),
            CacheKeyBuilder::user_count(),
        ]);

        for key in fixed {
            if let Some(previous) = seen.insert(key.build(), key.clone()) {
                panic!("{previous:?} 与 {key:?} 生成了相同的键");
            }
        }
    }

    fn arb_filter() -> impl Strategy<Value = ApplicationFilter> {
        prop::sample::select(ApplicationFilter::ALL.to_vec())
    }

    fn arb_page() -> impl Strategy<Value = Option<Page>> {
        prop::option::of((1u32..500, 1u32..200).prop_map(|(page, limit)| Page::new(page, limit)))
    }

    fn arb_key() -> impl Strategy<Value = CacheKey> {
        prop_oneof![
            (arb_filter(), arb_page())
                .prop_map(|(filter, page)| CacheKey::ApplicationList { filter, page }),
            (arb_filter(), ".*").prop_map(|(filter, term)| CacheKey::ApplicationSearch { filter, term }),
            Just(CacheKey::ApplicationStatusCount),
            Just(CacheKey::ApplicationPriorityCount),
            Just(CacheKey::UserApplicationsCount),
            Just(CacheKey::TrashedApplications),
            arb_page().prop_map(|page| CacheKey::UserList { page }),
            ".*".prop_map(|term| CacheKey::UserSearch { term }),
            Just(CacheKey::UserCount),
        ]
    }

    proptest! {
        #[test]
        fn prop_same_shape_same_key(key in arb_key()) {
            let copy = key.clone();
            prop_assert_eq!(key.build(), copy.build());
        }

        #[test]
        fn prop_build_then_parse_recovers_shape(key in arb_key()) {
            prop_assert_eq!(CacheKey::parse(&key.build()), Some(key));
        }

        #[test]
        fn prop_different_shapes_never_collide(a in arb_key(), b in arb_key()) {
            prop_assume!(a != b);
            prop_assert_ne!(a.build(), b.build());
        }
    }
}
