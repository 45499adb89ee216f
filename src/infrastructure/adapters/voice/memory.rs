//! In-Memory Voice Transport
//!
//! 测试与本地控制台运行时使用。频道拓扑与用户在场状态可编排；
//! 假会话把 is_playing 轮询当作流的时钟：轮询 N 次后流结束。
//! 活动连接集合以频道为键，与真实传输一致。

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::{
    VoiceChannelSnapshot, VoiceError, VoicePresence, VoiceSessionPort, VoiceTransportPort,
};
use crate::domain::{ChannelId, GuildId, UserId};

/// 内存语音传输
pub struct InMemoryVoiceTransport {
    /// guild id -> 频道快照（插入顺序即稳定扫描顺序）
    channels: DashMap<String, Vec<VoiceChannelSnapshot>>,
    /// (guild id, user id) -> 在场状态
    presences: DashMap<(String, String), VoicePresence>,
    /// 活动连接集合，频道 id -> 会话 id
    connections: Arc<DashMap<String, Uuid>>,
    /// 新会话的流长度（is_playing 轮询次数）
    play_polls: AtomicU32,
    /// 下一次 connect 的注入故障
    fail_with_timeout: AtomicBool,
    fail_with_refusal: AtomicBool,
    connect_attempts: AtomicU32,
    disconnected_users: Mutex<Vec<(GuildId, UserId)>>,
}

impl InMemoryVoiceTransport {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            presences: DashMap::new(),
            connections: Arc::new(DashMap::new()),
            play_polls: AtomicU32::new(u32::MAX),
            fail_with_timeout: AtomicBool::new(false),
            fail_with_refusal: AtomicBool::new(false),
            connect_attempts: AtomicU32::new(0),
            disconnected_users: Mutex::new(Vec::new()),
        }
    }

    /// 追加一个语音频道（扫描顺序 = 添加顺序）
    pub fn add_channel(&self, guild: &GuildId, snapshot: VoiceChannelSnapshot) {
        self.channels
            .entry(guild.as_str().to_string())
            .or_default()
            .push(snapshot);
    }

    /// 设置某用户的在场状态
    pub fn set_presence(&self, guild: &GuildId, user: &UserId, presence: VoicePresence) {
        self.presences.insert(
            (guild.as_str().to_string(), user.as_str().to_string()),
            presence,
        );
    }

    /// 把频道标记为已有活动连接（不创建会话）
    pub fn mark_connected(&self, channel: &ChannelId) {
        self.connections
            .insert(channel.as_str().to_string(), Uuid::new_v4());
    }

    /// 新会话的流在结束前允许的 is_playing 轮询次数
    pub fn set_play_ticks(&self, polls: u32) {
        self.play_polls.store(polls, Ordering::SeqCst);
    }

    /// 让下一次 connect 超时
    pub fn fail_next_connect_with_timeout(&self) {
        self.fail_with_timeout.store(true, Ordering::SeqCst);
    }

    /// 让下一次 connect 被拒（对端报已连接）
    pub fn fail_next_connect_with_refusal(&self) {
        self.fail_with_refusal.store(true, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn live_connections(&self) -> usize {
        self.connections.len()
    }

    /// disconnect_user 被调用过的 (租户, 用户) 列表
    pub fn disconnected_users(&self) -> Vec<(GuildId, UserId)> {
        self.disconnected_users
            .lock()
            .expect("disconnected_users poisoned")
            .clone()
    }
}

impl Default for InMemoryVoiceTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceTransportPort for InMemoryVoiceTransport {
    fn voice_channels(&self, guild: &GuildId) -> Vec<VoiceChannelSnapshot> {
        self.channels
            .get(guild.as_str())
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    fn voice_presence(&self, guild: &GuildId, user: &UserId) -> Option<VoicePresence> {
        self.presences
            .get(&(guild.as_str().to_string(), user.as_str().to_string()))
            .map(|entry| entry.clone())
    }

    fn is_connected_to(&self, channel: &ChannelId) -> bool {
        self.connections.contains_key(channel.as_str())
    }

    async fn connect(
        &self,
        channel: &ChannelId,
        _deadline: Duration,
    ) -> Result<Arc<dyn VoiceSessionPort>, VoiceError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_with_timeout.swap(false, Ordering::SeqCst) {
            return Err(VoiceError::Timeout(channel.as_str().to_string()));
        }
        if self.fail_with_refusal.swap(false, Ordering::SeqCst) {
            return Err(VoiceError::AlreadyConnected(channel.as_str().to_string()));
        }
        if self.connections.contains_key(channel.as_str()) {
            return Err(VoiceError::AlreadyConnected(channel.as_str().to_string()));
        }

        let session = Arc::new(InMemoryVoiceSession {
            id: Uuid::new_v4(),
            channel: channel.clone(),
            connections: self.connections.clone(),
            playing: AtomicBool::new(false),
            remaining_polls: AtomicU32::new(self.play_polls.load(Ordering::SeqCst)),
            connected: AtomicBool::new(true),
        });
        self.connections
            .insert(channel.as_str().to_string(), session.id);

        tracing::debug!(channel_id = %channel, session_id = %session.id, "Voice connected");
        Ok(session)
    }

    async fn disconnect_user(&self, guild: &GuildId, user: &UserId) -> Result<(), VoiceError> {
        tracing::debug!(guild_id = %guild, user_id = %user, "Moving user out of voice");
        self.disconnected_users
            .lock()
            .expect("disconnected_users poisoned")
            .push((guild.clone(), user.clone()));
        Ok(())
    }
}

/// 内存语音会话
#[derive(Debug)]
struct InMemoryVoiceSession {
    id: Uuid,
    channel: ChannelId,
    connections: Arc<DashMap<String, Uuid>>,
    playing: AtomicBool,
    /// 剩余的 is_playing 轮询次数，归零后流结束
    remaining_polls: AtomicU32,
    connected: AtomicBool,
}

#[async_trait]
impl VoiceSessionPort for InMemoryVoiceSession {
    async fn play(&self, source: &Path) -> Result<(), VoiceError> {
        tracing::debug!(session_id = %self.id, source = ?source, "Streaming clip");
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        if !self.playing.load(Ordering::SeqCst) {
            return false;
        }

        let left = self.remaining_polls.load(Ordering::SeqCst);
        if left == 0 {
            self.playing.store(false, Ordering::SeqCst);
            return false;
        }
        self.remaining_polls.store(left - 1, Ordering::SeqCst);
        true
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.connections.remove(self.channel.as_str());
        tracing::debug!(session_id = %self.id, channel_id = %self.channel, "Voice disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ParticipantState;

    fn guild() -> GuildId {
        GuildId::new("g1")
    }

    fn snapshot(id: &str, deaf: bool) -> VoiceChannelSnapshot {
        VoiceChannelSnapshot {
            id: ChannelId::new(id),
            name: id.to_string(),
            participants: vec![ParticipantState {
                user_id: UserId::new("7"),
                self_deaf: deaf,
            }],
        }
    }

    #[tokio::test]
    async fn test_connect_registers_and_disconnect_clears() {
        let transport = InMemoryVoiceTransport::new();
        transport.add_channel(&guild(), snapshot("vc1", false));

        let channel = ChannelId::new("vc1");
        let session = transport
            .connect(&channel, Duration::from_secs(2))
            .await
            .unwrap();

        assert!(transport.is_connected_to(&channel));
        assert!(session.is_connected());

        session.disconnect().await;
        assert!(!transport.is_connected_to(&channel));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_second_connect_to_same_channel_refused() {
        let transport = InMemoryVoiceTransport::new();
        let channel = ChannelId::new("vc1");

        let _session = transport
            .connect(&channel, Duration::from_secs(2))
            .await
            .unwrap();

        let err = transport
            .connect(&channel, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::AlreadyConnected(_)));
    }

    #[tokio::test]
    async fn test_stream_ends_after_configured_polls() {
        let transport = InMemoryVoiceTransport::new();
        transport.set_play_ticks(2);

        let session = transport
            .connect(&ChannelId::new("vc1"), Duration::from_secs(2))
            .await
            .unwrap();
        session.play(Path::new("/tmp/a.mp3")).await.unwrap();

        assert!(session.is_playing());
        assert!(session.is_playing());
        assert!(!session.is_playing());
    }
}
