//! Voice Transport Port - 语音传输
//!
//! 语音连接是进程级共享资源，以频道为键；连接集合的检查
//! 与建立都经由本端口。

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{ChannelId, GuildId, UserId};

/// 语音频道快照（参与者状态在快照时刻有效）
#[derive(Debug, Clone)]
pub struct VoiceChannelSnapshot {
    pub id: ChannelId,
    pub name: String,
    pub participants: Vec<ParticipantState>,
}

/// 频道内单个参与者的状态
#[derive(Debug, Clone)]
pub struct ParticipantState {
    pub user_id: UserId,
    pub self_deaf: bool,
}

/// 某用户的语音在场状态
///
/// `channel` 为 None 表示有语音会话但不在任何频道中。
#[derive(Debug, Clone)]
pub struct VoicePresence {
    pub channel: Option<ChannelId>,
    pub self_deaf: bool,
}

/// 语音传输错误
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Already connected to channel {0}")]
    AlreadyConnected(String),

    #[error("Connect timed out for channel {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Voice Transport Port
#[async_trait]
pub trait VoiceTransportPort: Send + Sync {
    /// 租户的语音频道，稳定确定的顺序
    fn voice_channels(&self, guild: &GuildId) -> Vec<VoiceChannelSnapshot>;

    /// 用户当前的语音在场状态；无语音会话时为 None
    fn voice_presence(&self, guild: &GuildId, user: &UserId) -> Option<VoicePresence>;

    /// 活动连接集合中是否已有指向该频道的连接
    fn is_connected_to(&self, channel: &ChannelId) -> bool;

    /// 连接到频道，受 deadline 约束
    async fn connect(
        &self,
        channel: &ChannelId,
        deadline: Duration,
    ) -> Result<Arc<dyn VoiceSessionPort>, VoiceError>;

    /// 把用户移出语音（outro 的定时子事件使用）
    async fn disconnect_user(&self, guild: &GuildId, user: &UserId) -> Result<(), VoiceError>;
}

/// 一次已建立的语音会话
#[async_trait]
pub trait VoiceSessionPort: Send + Sync + std::fmt::Debug {
    /// 开始播放给定路径的音频
    async fn play(&self, source: &Path) -> Result<(), VoiceError>;

    fn is_playing(&self) -> bool;

    fn is_connected(&self) -> bool;

    /// 停止仍在播放的流
    fn stop(&self);

    /// 断开会话；清理路径上调用，不向外传播失败
    async fn disconnect(&self);
}
