//! # 错误处理宏

/// 快速创建配置错误的宏
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::TrackerError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::TrackerError::config(format!($fmt, $($arg)*))
    };
}

/// 快速创建缓存错误的宏
#[macro_export]
macro_rules! cache_error {
    ($msg:expr) => {
        $crate::error::TrackerError::cache($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::TrackerError::cache(format!($fmt, $($arg)*))
    };
}

/// 快速创建文档存储错误的宏
#[macro_export]
macro_rules! store_error {
    ($msg:expr) => {
        $crate::error::TrackerError::store($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::TrackerError::store(format!($fmt, $($arg)*))
    };
}

/// 确保条件成立，否则返回配置错误
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::config_error!($msg));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::config_error!($fmt, $($arg)*));
        }
    };
}

/// 确保条件成立，否则返回校验错误
#[macro_export]
macro_rules! ensure_valid {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::error::TrackerError::validation($msg));
        }
    };
}
