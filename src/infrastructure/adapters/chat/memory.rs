//! In-Memory Chat Connector
//!
//! 测试与本地控制台运行时使用：出站消息被记录（并打到日志），
//! 附件与其内容可以预先种入。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;

use crate::application::ports::{Attachment, ChatConnectorPort, ChatError};
use crate::domain::ChannelId;

/// 记录下来的出站消息
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Text {
        channel: ChannelId,
        text: String,
    },
    Embed {
        channel: ChannelId,
        title: String,
        body: String,
    },
}

/// 内存聊天连接器
pub struct InMemoryChatConnector {
    outbound: Mutex<Vec<OutboundMessage>>,
    /// channel id -> 最近消息携带的附件（新到旧）
    attachments: DashMap<String, Vec<Attachment>>,
    /// url -> 附件内容
    downloads: DashMap<String, Vec<u8>>,
}

impl InMemoryChatConnector {
    pub fn new() -> Self {
        Self {
            outbound: Mutex::new(Vec::new()),
            attachments: DashMap::new(),
            downloads: DashMap::new(),
        }
    }

    /// 预置频道附件
    pub fn seed_attachment(&self, channel: &ChannelId, attachment: Attachment) {
        self.attachments
            .entry(channel.as_str().to_string())
            .or_default()
            .insert(0, attachment);
    }

    /// 预置附件内容
    pub fn seed_download(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.downloads.insert(url.into(), bytes);
    }

    /// 已发送消息的快照
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.outbound.lock().expect("outbound poisoned").clone()
    }

    /// 已发送的纯文本（断言辅助）
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|msg| match msg {
                OutboundMessage::Text { text, .. } => Some(text),
                OutboundMessage::Embed { .. } => None,
            })
            .collect()
    }

    fn record(&self, message: OutboundMessage) {
        self.outbound.lock().expect("outbound poisoned").push(message);
    }
}

impl Default for InMemoryChatConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatConnectorPort for InMemoryChatConnector {
    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<(), ChatError> {
        tracing::info!(channel_id = %channel, "[chat] {}", text);
        self.record(OutboundMessage::Text {
            channel: channel.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_embed(
        &self,
        channel: &ChannelId,
        title: &str,
        body: &str,
    ) -> Result<(), ChatError> {
        tracing::info!(channel_id = %channel, "[chat] {}\n{}", title, body);
        self.record(OutboundMessage::Embed {
            channel: channel.clone(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn recent_attachments(
        &self,
        channel: &ChannelId,
        limit: usize,
    ) -> Result<Vec<Attachment>, ChatError> {
        Ok(self
            .attachments
            .get(channel.as_str())
            .map(|entry| entry.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn download(&self, attachment: &Attachment) -> Result<Vec<u8>, ChatError> {
        self.downloads
            .get(&attachment.url)
            .map(|entry| entry.clone())
            .ok_or_else(|| ChatError::FetchFailed(format!("no content for {}", attachment.url)))
    }
}
