//! # 配置管理模块
//!
//! 处理应用配置加载、环境变量覆盖和验证

mod app_config;

pub use app_config::{AppConfig, CacheConfig, CacheType, RedisConfig};

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Context, Result};
use crate::{config_error, ldebug};
use crate::logging::{LogComponent, LogStage};

/// 加载配置文件
///
/// 优先使用 `KEPLER_CONFIG_PATH`，否则读取 `config/config.{RUST_ENV}.toml`。
pub fn load_config() -> Result<AppConfig> {
    load_config_from(default_config_path())
}

/// 默认配置文件路径
#[must_use]
pub fn default_config_path() -> PathBuf {
    env::var("KEPLER_CONFIG_PATH").map_or_else(
        |_| {
            let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            PathBuf::from(format!("config/config.{env}.toml"))
        },
        PathBuf::from,
    )
}

/// 从指定文件加载配置
pub fn load_config_from(config_file: impl AsRef<Path>) -> Result<AppConfig> {
    let config_file = config_file.as_ref();
    if !config_file.exists() {
        return Err(config_error!("配置文件不存在: {}", config_file.display()));
    }

    let content = std::fs::read_to_string(config_file)
        .with_context(|| format!("读取配置文件失败: {}", config_file.display()))?;

    let config = parse_config(&content, |name| env::var(name).ok())?;
    ldebug!(
        "system",
        LogStage::Config,
        LogComponent::Config,
        "config_loaded",
        &format!("配置加载完成: {}", config_file.display())
    );
    Ok(config)
}

/// 解析 TOML 配置，应用环境变量覆盖并验证
///
/// `lookup` 用于读取环境变量，测试中可以注入固定值。
pub fn parse_config<F>(content: &str, lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: AppConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, lookup)?;
    config.validate()?;
    Ok(config)
}

/// 环境变量覆盖：`REDIS_URL`、`KEPLER_CACHE_TYPE`
fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(cache_type) = lookup("KEPLER_CACHE_TYPE") {
        config.cache.cache_type = match cache_type.to_lowercase().as_str() {
            "memory" => CacheType::Memory,
            "redis" => CacheType::Redis,
            other => {
                return Err(config_error!("无效的 KEPLER_CACHE_TYPE: {other}"));
            }
        };
    }

    if let Some(url) = lookup("REDIS_URL") {
        config.cache.redis.get_or_insert_with(RedisConfig::default).url = url;
    }

    Ok(())
}
