//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 机器人配置
    #[serde(default)]
    pub bot: BotConfig,

    /// 音频配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            audio: AudioConfig::default(),
            storage: StorageConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// 机器人配置
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// 默认命令前缀（单字符，新租户首次出现时写入其记录）
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// 机器人名称（help 标题）
    #[serde(default = "default_title")]
    pub title: String,

    /// 命令定义表路径
    #[serde(default = "default_commands_file")]
    pub commands_file: PathBuf,

    /// 管理员用户 ID 白名单（admin 权限命令）
    #[serde(default)]
    pub admin_ids: Vec<String>,
}

fn default_prefix() -> String {
    "$".to_string()
}

fn default_title() -> String {
    "clipcast".to_string()
}

fn default_commands_file() -> PathBuf {
    PathBuf::from("commands.toml")
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            title: default_title(),
            commands_file: default_commands_file(),
            admin_ids: Vec::new(),
        }
    }
}

impl BotConfig {
    /// 默认前缀的字符形式
    ///
    /// validate_config 保证前缀为单字符
    pub fn prefix_char(&self) -> char {
        self.prefix.chars().next().unwrap_or('$')
    }
}

/// 音频配置
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// 音频文件根目录
    #[serde(default = "default_audio_root")]
    pub storage_root: PathBuf,

    /// 租户音频子目录（每个租户一个以其 ID 命名的目录）
    #[serde(default = "default_server_dir")]
    pub server_dir: String,

    /// 共享音频子目录
    #[serde(default = "default_common_dir")]
    pub common_dir: String,

    /// 保存文件使用的扩展名
    #[serde(default = "default_file_ext")]
    pub file_ext: String,

    /// 接受的附件音频子类型（content-type 的第二段）
    #[serde(default = "default_accepted_types")]
    pub accepted_types: Vec<String>,

    /// 普通播放的倒计时长度（tick 数）
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,

    /// outro 播放的倒计时长度（tick 数）
    #[serde(default = "default_timeout")]
    pub outro_timeout_seconds: u32,

    /// outro 播放中断开用户的剩余时间阈值
    #[serde(default = "default_outro_dc")]
    pub outro_user_dc_seconds: u32,

    /// 语音连接超时（毫秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// 轮询 tick 间隔（毫秒）
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
}

fn default_audio_root() -> PathBuf {
    PathBuf::from("data/audio")
}

fn default_server_dir() -> String {
    "servers".to_string()
}

fn default_common_dir() -> String {
    "common".to_string()
}

fn default_file_ext() -> String {
    "mp3".to_string()
}

fn default_accepted_types() -> Vec<String> {
    vec!["mpeg".to_string()]
}

fn default_timeout() -> u32 {
    8
}

fn default_outro_dc() -> u32 {
    3
}

fn default_connect_timeout() -> u64 {
    2000
}

fn default_tick() -> u64 {
    1000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            storage_root: default_audio_root(),
            server_dir: default_server_dir(),
            common_dir: default_common_dir(),
            file_ext: default_file_ext(),
            accepted_types: default_accepted_types(),
            timeout_seconds: default_timeout(),
            outro_timeout_seconds: default_timeout(),
            outro_user_dc_seconds: default_outro_dc(),
            connect_timeout_ms: default_connect_timeout(),
            tick_ms: default_tick(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 集合存储目录（manifest.json 与 *.dat 文件）
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.bot.prefix, "$");
        assert_eq!(config.bot.prefix_char(), '$');
        assert_eq!(config.audio.timeout_seconds, 8);
        assert_eq!(config.audio.file_ext, "mp3");
        assert_eq!(config.storage.data_dir, PathBuf::from("data/store"));
    }

    #[test]
    fn test_default_accepted_types() {
        let config = AudioConfig::default();
        assert_eq!(config.accepted_types, vec!["mpeg".to_string()]);
    }
}
