//! # 应用装配
//!
//! 根据配置创建缓存存储、辅助层、失效协调器和查询服务

pub mod context;

pub use context::{AppContext, DocumentStores, build_cache_store};
