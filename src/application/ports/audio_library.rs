//! Audio Library Port - 音频片段文件库
//!
//! 片段按 `<root>/<server-dir>/<tenant>/<track>.<ext>`（租户私有）
//! 或 `<root>/<common-dir>/<track>.<ext>`（共享）存放。

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::GuildId;

/// 文件库错误
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("I/O error: {0}")]
    Io(String),
}

/// Audio Library Port
#[async_trait]
pub trait AudioLibraryPort: Send + Sync {
    /// 租户私有片段的路径（不保证存在）
    fn tenant_path(&self, guild: &GuildId, track: &str) -> PathBuf;

    /// 共享片段的路径（不保证存在）
    fn common_path(&self, track: &str) -> PathBuf;

    /// 定位可播放的片段文件：先查租户目录，再查共享目录
    fn resolve(&self, guild: &GuildId, track: &str) -> Option<PathBuf>;

    /// 保存片段到租户目录，必要时创建目录
    async fn save(&self, guild: &GuildId, track: &str, data: &[u8])
        -> Result<PathBuf, LibraryError>;

    /// 删除租户目录中的片段文件
    async fn delete(&self, guild: &GuildId, track: &str) -> Result<(), LibraryError>;
}
