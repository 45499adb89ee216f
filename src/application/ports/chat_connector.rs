//! Chat Connector Port - 聊天平台连接器
//!
//! 核心只消费规范化后的消息记录，不接触平台线协议。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChannelId, GuildId, UserId};

/// 规范化的入站消息
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_display_name: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

/// 消息附件
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    /// MIME 形式，如 `audio/mpeg`
    pub content_type: String,
    pub size_bytes: u64,
    /// 平台侧的取回句柄
    pub url: String,
}

impl Attachment {
    /// content-type 的主/子类型
    pub fn type_parts(&self) -> Option<(&str, &str)> {
        self.content_type.split_once('/')
    }
}

/// 连接器错误
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Attachment fetch failed: {0}")]
    FetchFailed(String),
}

/// Chat Connector Port
#[async_trait]
pub trait ChatConnectorPort: Send + Sync {
    /// 发送纯文本
    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<(), ChatError>;

    /// 发送带标题的富文本块
    async fn send_embed(&self, channel: &ChannelId, title: &str, body: &str)
        -> Result<(), ChatError>;

    /// 频道最近消息携带的附件（新到旧）
    async fn recent_attachments(
        &self,
        channel: &ChannelId,
        limit: usize,
    ) -> Result<Vec<Attachment>, ChatError>;

    /// 取回附件内容
    async fn download(&self, attachment: &Attachment) -> Result<Vec<u8>, ChatError>;
}
