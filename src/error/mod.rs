//! # 统一错误处理
//!
//! 缓存层与服务层共用的错误类型、结果别名和上下文扩展

pub use types::TrackerError;

/// 全局统一的 Result 类型
pub type Result<T> = std::result::Result<T, TrackerError>;

pub mod macros;
pub mod types;

/// 为错误附加上下文说明
pub trait Context<T, E> {
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display;

    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<TrackerError>,
{
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display,
    {
        self.with_context(|| context)
    }

    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(TrackerError::Context {
                context: context().to_string(),
                source: Box::new(error.into()),
            }),
        }
    }
}

/// 错误归属，命令行据此选择退出码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 调用方导致：输入非法或文档不存在
    Client,
    /// 服务自身或其依赖故障
    Server,
}
