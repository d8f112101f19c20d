//! # Kepler Cache
//!
//! 任务追踪系统的读穿透缓存层：应用与用户两个聚合的查询结果缓存，
//! 以及写操作提交后按模式清除的失效机制。

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use app::AppContext;
pub use config::AppConfig;
pub use error::{Result, TrackerError};
