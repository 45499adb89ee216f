//! File Audio Library - 文件系统音频片段库
//!
//! 实现 AudioLibraryPort trait

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{AudioLibraryPort, LibraryError};
use crate::config::AudioConfig;
use crate::domain::GuildId;

/// 文件系统音频库
pub struct FileAudioLibrary {
    /// 音频根目录
    root: PathBuf,
    server_dir: String,
    common_dir: String,
    ext: String,
}

impl FileAudioLibrary {
    /// 创建音频库，确保根目录与两个子目录存在
    pub async fn new(
        root: impl AsRef<Path>,
        server_dir: impl Into<String>,
        common_dir: impl Into<String>,
        ext: impl Into<String>,
    ) -> Result<Self, LibraryError> {
        let root = root.as_ref().to_path_buf();
        let server_dir = server_dir.into();
        let common_dir = common_dir.into();

        fs::create_dir_all(root.join(&server_dir))
            .await
            .map_err(|e| LibraryError::Io(e.to_string()))?;
        fs::create_dir_all(root.join(&common_dir))
            .await
            .map_err(|e| LibraryError::Io(e.to_string()))?;

        Ok(Self {
            root,
            server_dir,
            common_dir,
            ext: ext.into(),
        })
    }

    pub async fn from_config(audio: &AudioConfig) -> Result<Self, LibraryError> {
        Self::new(
            &audio.storage_root,
            audio.server_dir.clone(),
            audio.common_dir.clone(),
            audio.file_ext.clone(),
        )
        .await
    }

    fn file_name(&self, track: &str) -> String {
        format!("{}.{}", track, self.ext)
    }
}

#[async_trait]
impl AudioLibraryPort for FileAudioLibrary {
    fn tenant_path(&self, guild: &GuildId, track: &str) -> PathBuf {
        self.root
            .join(&self.server_dir)
            .join(guild.as_str())
            .join(self.file_name(track))
    }

    fn common_path(&self, track: &str) -> PathBuf {
        self.root.join(&self.common_dir).join(self.file_name(track))
    }

    fn resolve(&self, guild: &GuildId, track: &str) -> Option<PathBuf> {
        let tenant = self.tenant_path(guild, track);
        if tenant.is_file() {
            return Some(tenant);
        }

        let common = self.common_path(track);
        if common.is_file() {
            return Some(common);
        }

        None
    }

    async fn save(
        &self,
        guild: &GuildId,
        track: &str,
        data: &[u8],
    ) -> Result<PathBuf, LibraryError> {
        let dir = self.root.join(&self.server_dir).join(guild.as_str());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| LibraryError::Io(e.to_string()))?;

        let path = dir.join(self.file_name(track));
        fs::write(&path, data)
            .await
            .map_err(|e| LibraryError::Io(e.to_string()))?;

        tracing::debug!(
            guild_id = %guild,
            track = track,
            size = data.len(),
            "Saved clip file"
        );
        Ok(path)
    }

    async fn delete(&self, guild: &GuildId, track: &str) -> Result<(), LibraryError> {
        let path = self.tenant_path(guild, track);
        fs::remove_file(&path)
            .await
            .map_err(|e| LibraryError::Io(e.to_string()))?;

        tracing::debug!(guild_id = %guild, track = track, "Deleted clip file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn library(dir: &Path) -> FileAudioLibrary {
        FileAudioLibrary::new(dir, "servers", "common", "mp3")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_resolve_delete() {
        let dir = tempdir().unwrap();
        let library = library(dir.path()).await;
        let guild = GuildId::new("g1");

        assert!(library.resolve(&guild, "horn").is_none());

        let path = library.save(&guild, "horn", b"mp3 bytes").await.unwrap();
        assert!(path.ends_with("servers/g1/horn.mp3"));
        assert_eq!(library.resolve(&guild, "horn").unwrap(), path);

        library.delete(&guild, "horn").await.unwrap();
        assert!(library.resolve(&guild, "horn").is_none());
    }

    #[tokio::test]
    async fn test_common_fallback() {
        let dir = tempdir().unwrap();
        let library = library(dir.path()).await;
        let guild = GuildId::new("g1");

        std::fs::write(dir.path().join("common/horn.mp3"), b"shared").unwrap();

        let resolved = library.resolve(&guild, "horn").unwrap();
        assert_eq!(resolved, library.common_path("horn"));

        // 租户自己的文件优先于共享文件
        library.save(&guild, "horn", b"own").await.unwrap();
        let resolved = library.resolve(&guild, "horn").unwrap();
        assert_eq!(resolved, library.tenant_path(&guild, "horn"));
    }
}
