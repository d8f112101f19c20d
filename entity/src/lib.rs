//! # Entity 模块
//!
//! 任务追踪系统的文档模型定义（Application / Task / Activity / User）

pub mod activity;
pub mod application;
pub mod task;
pub mod user;

pub use activity::Model as Activity;
pub use application::Model as Application;
pub use task::Model as Task;
pub use user::Model as User;
