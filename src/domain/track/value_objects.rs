//! Track Context - Value Objects

use serde::{Deserialize, Serialize};

use super::TrackError;
use crate::domain::UserId;

/// 规范化音轨名称
///
/// 用户输入的名称按空白切分后以下划线连接，作为注册表键与文件名。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackName(String);

impl TrackName {
    /// 从命令参数构造规范化名称
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, TrackError> {
        let joined = args
            .iter()
            .map(|a| a.as_ref().trim())
            .filter(|a| !a.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        if joined.is_empty() {
            return Err(TrackError::InvalidName);
        }
        Ok(Self(joined))
    }

    /// 已经是存储形式的名称（来自注册表键）
    pub fn from_stored(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// outro 绑定 - 将音轨标记为某用户的退场音
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutroBinding {
    pub display_name: String,
    pub id: UserId,
}

impl OutroBinding {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            id,
        }
    }
}
