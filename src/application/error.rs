//! 应用层错误定义
//!
//! 统一的服务/处理器错误类型

use thiserror::Error;

use crate::application::ports::{ChatError, StoreError};
use crate::domain::track::TrackError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 聊天连接器错误
    #[error("Chat error: {0}")]
    ChatError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<ChatError> for ApplicationError {
    fn from(err: ChatError) -> Self {
        Self::ChatError(err.to_string())
    }
}

impl From<TrackError> for ApplicationError {
    fn from(err: TrackError) -> Self {
        Self::ValidationError(err.to_string())
    }
}
