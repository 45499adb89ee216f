//! Track Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("音轨不存在: {0}")]
    UnknownTrack(String),

    #[error("音轨已存在: {0}")]
    AlreadyExists(String),

    #[error("无效的音轨名称")]
    InvalidName,
}
