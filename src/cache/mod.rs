//! # 缓存模块
//!
//! 读穿透缓存：存储适配器、辅助层、键命名规范、TTL 策略与失效协调

pub mod client;
pub mod helper;
pub mod invalidation;
pub mod keys;
pub mod single_flight;
pub mod store;
pub mod strategies;

pub use client::RedisStore;
pub use helper::{CacheHelper, CacheStats};
pub use invalidation::{Aggregate, InvalidationCoordinator, InvalidationGroup, InvalidationReport};
pub use keys::{ApplicationFilter, CacheKey, CacheKeyBuilder, Namespace, Page};
pub use single_flight::SingleFlight;
pub use store::{CacheStore, MemoryStore, UnavailableStore, glob_to_regex};
#[cfg(any(test, feature = "testing"))]
pub use store::MockCacheStore;
pub use strategies::{CacheTtl, TtlPolicy};
