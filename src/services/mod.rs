//! # 查询处理服务
//!
//! 每个读操作按查询形态计算缓存键并走读穿透，每个写操作提交后清除对应失效组

pub mod applications;
pub mod users;

pub use applications::{ApplicationService, count_for};
pub use users::UserService;
