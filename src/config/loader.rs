//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `CLIPCAST_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `CLIPCAST_BOT__PREFIX=!`
/// - `CLIPCAST_AUDIO__STORAGE_ROOT=/data/audio`
/// - `CLIPCAST_STORAGE__DATA_DIR=/data/store`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("bot.prefix", "$")?
        .set_default("bot.title", "clipcast")?
        .set_default("bot.commands_file", "commands.toml")?
        .set_default("bot.admin_ids", Vec::<String>::new())?
        .set_default("audio.storage_root", "data/audio")?
        .set_default("audio.server_dir", "servers")?
        .set_default("audio.common_dir", "common")?
        .set_default("audio.file_ext", "mp3")?
        .set_default("audio.accepted_types", vec!["mpeg".to_string()])?
        .set_default("audio.timeout_seconds", 8)?
        .set_default("audio.outro_timeout_seconds", 8)?
        .set_default("audio.outro_user_dc_seconds", 3)?
        .set_default("audio.connect_timeout_ms", 2000)?
        .set_default("audio.tick_ms", 1000)?
        .set_default("storage.data_dir", "data/store")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        // 搜索默认配置文件
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: CLIPCAST_
    // 层级分隔符: __ (双下划线)
    // 例如: CLIPCAST_BOT__PREFIX=!
    builder = builder.add_source(
        Environment::with_prefix("CLIPCAST")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // 前缀必须是单字符
    if config.bot.prefix.chars().count() != 1 {
        return Err(ConfigError::ValidationError(format!(
            "Bot prefix must be a single character, got '{}'",
            config.bot.prefix
        )));
    }

    // 扩展名不能为空
    if config.audio.file_ext.is_empty() {
        return Err(ConfigError::ValidationError(
            "Audio file extension cannot be empty".to_string(),
        ));
    }

    // 倒计时必须为正
    if config.audio.timeout_seconds == 0 || config.audio.outro_timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "Playback timeouts cannot be 0".to_string(),
        ));
    }

    // tick 间隔必须为正
    if config.audio.tick_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Poll tick interval cannot be 0".to_string(),
        ));
    }

    // 存储目录不能为空
    if config.storage.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Storage data_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Bot Title: {}", config.bot.title);
    tracing::info!("Default Prefix: {}", config.bot.prefix);
    tracing::info!("Commands File: {:?}", config.bot.commands_file);
    tracing::info!("Admin IDs: {}", config.bot.admin_ids.len());
    tracing::info!("Audio Root: {:?}", config.audio.storage_root);
    tracing::info!(
        "Audio Dirs: server={}, common={}",
        config.audio.server_dir,
        config.audio.common_dir
    );
    tracing::info!(
        "Playback Timeouts: sound={}s, outro={}s (dc at {}s remaining)",
        config.audio.timeout_seconds,
        config.audio.outro_timeout_seconds,
        config.audio.outro_user_dc_seconds
    );
    tracing::info!("Store Directory: {:?}", config.storage.data_dir);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_long_prefix() {
        let mut config = AppConfig::default();
        config.bot.prefix = "$$".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_timeout() {
        let mut config = AppConfig::default();
        config.audio.timeout_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_tick() {
        let mut config = AppConfig::default();
        config.audio.tick_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_ext() {
        let mut config = AppConfig::default();
        config.audio.file_ext = String::new();
        assert!(validate_config(&config).is_err());
    }
}
