//! Playback Orchestrator - 播放编排器
//!
//! 为一个 (请求者, 音轨) 对驱动恰好一次播放尝试:
//! 解析目标、检查连接冲突、连接、播放，并监督一个受墙钟上限
//! 约束的轮询循环与其间的定时子事件。
//!
//! 唯一的无条件保证：只要连接建立过，清理（停流 + 断开）
//! 一定在返回之前执行。

use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::target::resolve_target;
use super::{PlaybackConfig, PlaybackOutcome, SubEvent};
use crate::application::ports::{
    AudioLibraryPort, VoiceError, VoiceSessionPort, VoiceTransportPort,
};
use crate::domain::track::TrackName;
use crate::domain::{GuildId, UserId};

/// 连接生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connecting,
    Playing,
    Draining,
    Disconnected,
    Aborted,
}

/// 播放编排器
pub struct PlaybackOrchestrator {
    voice: Arc<dyn VoiceTransportPort>,
    library: Arc<dyn AudioLibraryPort>,
    config: PlaybackConfig,
}

impl PlaybackOrchestrator {
    pub fn new(
        voice: Arc<dyn VoiceTransportPort>,
        library: Arc<dyn AudioLibraryPort>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            voice,
            library,
            config,
        }
    }

    /// 驱动一次播放尝试到终态
    ///
    /// `timeout` 是倒计时 tick 数；`events` 是按剩余时间阈值触发的
    /// 子事件。失败一律作为结果值返回，绝不向上抛。
    pub async fn play(
        &self,
        guild: &GuildId,
        requester: &UserId,
        track: &TrackName,
        timeout: u32,
        events: Vec<SubEvent>,
    ) -> PlaybackOutcome {
        let attempt_id = Uuid::new_v4();
        let mut phase = Phase::Idle;

        // 目标解析
        let Some(channel) = resolve_target(self.voice.as_ref(), guild, requester) else {
            tracing::debug!(attempt = %attempt_id, guild_id = %guild, "No playback target");
            return PlaybackOutcome::NoTarget;
        };

        // 冲突检查：同一频道的连接是进程级共享资源，碰撞是良性跳过
        if self.voice.is_connected_to(&channel) {
            tracing::debug!(
                attempt = %attempt_id,
                channel_id = %channel,
                "Already connected to target channel, skipping"
            );
            self.advance(attempt_id, &mut phase, Phase::Aborted);
            return PlaybackOutcome::AlreadyConnected;
        }

        self.advance(attempt_id, &mut phase, Phase::Connecting);
        let session = match self
            .voice
            .connect(&channel, self.config.connect_deadline)
            .await
        {
            Ok(session) => session,
            Err(VoiceError::AlreadyConnected(_)) => {
                tracing::debug!(attempt = %attempt_id, channel_id = %channel, "Connect refused, already connected");
                self.advance(attempt_id, &mut phase, Phase::Aborted);
                return PlaybackOutcome::AlreadyConnected;
            }
            Err(VoiceError::Timeout(_)) => {
                tracing::error!(attempt = %attempt_id, channel_id = %channel, "Connect timed out");
                self.advance(attempt_id, &mut phase, Phase::Aborted);
                return PlaybackOutcome::ConnectTimeout;
            }
            Err(e) => {
                tracing::error!(attempt = %attempt_id, channel_id = %channel, error = %e, "Connect failed");
                self.advance(attempt_id, &mut phase, Phase::Aborted);
                return PlaybackOutcome::Aborted;
            }
        };

        // 定位片段文件：租户目录优先，其次共享目录。
        // 连接已建立，任何提前退出都要走清理。
        let Some(source) = self.library.resolve(guild, track.as_str()) else {
            tracing::error!(attempt = %attempt_id, track = %track, "Clip file not found");
            self.drain(attempt_id, &mut phase, &session).await;
            return PlaybackOutcome::FileNotFound;
        };

        if let Err(e) = session.play(&source).await {
            tracing::error!(attempt = %attempt_id, error = %e, "Stream start failed");
            self.drain(attempt_id, &mut phase, &session).await;
            return PlaybackOutcome::Aborted;
        }
        self.advance(attempt_id, &mut phase, Phase::Playing);

        // 轮询循环：每 tick 递减剩余时间，倒计时耗尽、流结束或
        // 连接掉线时退出，以先到者为准。
        let mut remaining = timeout;
        let mut pending = events;
        let mut launched: JoinSet<()> = JoinSet::new();

        while remaining > 0 && session.is_playing() && session.is_connected() {
            // 到达阈值的子事件本 tick 启动并移出队列
            let mut i = 0;
            while i < pending.len() {
                if remaining <= pending[i].at {
                    let event = pending.remove(i);
                    match event.work {
                        Some(work) => {
                            tracing::debug!(
                                attempt = %attempt_id,
                                at = event.at,
                                remaining = remaining,
                                "Launching scheduled sub-event"
                            );
                            launched.spawn(work);
                        }
                        None => {
                            tracing::debug!(
                                attempt = %attempt_id,
                                at = event.at,
                                "Dropping sub-event without work"
                            );
                        }
                    }
                } else {
                    i += 1;
                }
            }

            tokio::time::sleep(self.config.tick).await;
            remaining -= 1;
        }

        self.drain(attempt_id, &mut phase, &session).await;

        // 等待所有已启动的子事件完成；子事件应当近乎即时，
        // 这里刻意不设额外超时。
        if !launched.is_empty() {
            tracing::debug!(
                attempt = %attempt_id,
                count = launched.len(),
                "Joining launched sub-events"
            );
            while let Some(result) = launched.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(attempt = %attempt_id, error = %e, "Sub-event task failed");
                }
            }
        }

        tracing::debug!(attempt = %attempt_id, "Playback attempt finished");
        PlaybackOutcome::Completed
    }

    /// 无条件清理：停掉仍在播放的流，断开仍然存活的连接
    async fn drain(
        &self,
        attempt_id: Uuid,
        phase: &mut Phase,
        session: &Arc<dyn VoiceSessionPort>,
    ) {
        self.advance(attempt_id, phase, Phase::Draining);

        if session.is_playing() {
            session.stop();
        }
        if session.is_connected() {
            session.disconnect().await;
        }

        self.advance(attempt_id, phase, Phase::Disconnected);
    }

    fn advance(&self, attempt_id: Uuid, phase: &mut Phase, next: Phase) {
        tracing::trace!(attempt = %attempt_id, from = ?phase, to = ?next, "Playback phase");
        *phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ParticipantState, VoiceChannelSnapshot, VoicePresence};
    use crate::domain::ChannelId;
    use crate::infrastructure::adapters::voice::InMemoryVoiceTransport;
    use futures_util::FutureExt;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    struct StubLibrary {
        path: Option<PathBuf>,
    }

    #[async_trait::async_trait]
    impl AudioLibraryPort for StubLibrary {
        fn tenant_path(&self, _guild: &GuildId, track: &str) -> PathBuf {
            PathBuf::from(format!("/tmp/{}.mp3", track))
        }

        fn common_path(&self, track: &str) -> PathBuf {
            PathBuf::from(format!("/tmp/common/{}.mp3", track))
        }

        fn resolve(&self, _guild: &GuildId, _track: &str) -> Option<PathBuf> {
            self.path.clone()
        }

        async fn save(
            &self,
            _guild: &GuildId,
            _track: &str,
            _data: &[u8],
        ) -> Result<PathBuf, crate::application::ports::LibraryError> {
            unimplemented!("not used in orchestrator tests")
        }

        async fn delete(
            &self,
            _guild: &GuildId,
            _track: &str,
        ) -> Result<(), crate::application::ports::LibraryError> {
            unimplemented!("not used in orchestrator tests")
        }
    }

    fn test_config() -> PlaybackConfig {
        PlaybackConfig {
            tick: Duration::from_millis(5),
            connect_deadline: Duration::from_millis(50),
            sound_timeout: 8,
            outro_timeout: 8,
        }
    }

    fn orchestrator_with(
        voice: Arc<InMemoryVoiceTransport>,
        clip: Option<PathBuf>,
    ) -> PlaybackOrchestrator {
        PlaybackOrchestrator::new(
            voice,
            Arc::new(StubLibrary { path: clip }),
            test_config(),
        )
    }

    fn guild() -> GuildId {
        GuildId::new("g1")
    }

    fn listening_channel(voice: &InMemoryVoiceTransport) -> ChannelId {
        let channel = ChannelId::new("vc1");
        voice.add_channel(
            &guild(),
            VoiceChannelSnapshot {
                id: channel.clone(),
                name: "General".to_string(),
                participants: vec![ParticipantState {
                    user_id: UserId::new("7"),
                    self_deaf: false,
                }],
            },
        );
        channel
    }

    #[tokio::test]
    async fn test_completed_run_disconnects() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        listening_channel(&voice);
        // 流长度 3 tick，小于倒计时
        voice.set_play_ticks(3);

        let orchestrator = orchestrator_with(voice.clone(), Some(PathBuf::from("/tmp/a.mp3")));
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert_eq!(voice.connect_attempts(), 1);
        assert_eq!(voice.live_connections(), 0);
    }

    #[tokio::test]
    async fn test_no_target_when_everyone_deafened() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        voice.add_channel(
            &guild(),
            VoiceChannelSnapshot {
                id: ChannelId::new("vc1"),
                name: "AFK".to_string(),
                participants: vec![ParticipantState {
                    user_id: UserId::new("7"),
                    self_deaf: true,
                }],
            },
        );

        let orchestrator = orchestrator_with(voice.clone(), Some(PathBuf::from("/tmp/a.mp3")));
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::NoTarget);
        assert_eq!(voice.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_presence_without_channel_is_no_target() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        listening_channel(&voice);
        voice.set_presence(
            &guild(),
            &UserId::new("1"),
            VoicePresence {
                channel: None,
                self_deaf: false,
            },
        );

        let orchestrator = orchestrator_with(voice.clone(), Some(PathBuf::from("/tmp/a.mp3")));
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::NoTarget);
        assert_eq!(voice.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_collision_aborts_without_duplicate_connect() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        let channel = listening_channel(&voice);
        voice.mark_connected(&channel);

        let orchestrator = orchestrator_with(voice.clone(), Some(PathBuf::from("/tmp/a.mp3")));
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::AlreadyConnected);
        // 绝不发起重复连接
        assert_eq!(voice.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_transport_refusal_is_already_connected() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        listening_channel(&voice);
        voice.fail_next_connect_with_refusal();

        let orchestrator = orchestrator_with(voice.clone(), Some(PathBuf::from("/tmp/a.mp3")));
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::AlreadyConnected);
        assert_eq!(voice.live_connections(), 0);
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        listening_channel(&voice);
        voice.fail_next_connect_with_timeout();

        let orchestrator = orchestrator_with(voice.clone(), Some(PathBuf::from("/tmp/a.mp3")));
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::ConnectTimeout);
        assert_eq!(voice.live_connections(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_cleans_up_connection() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        listening_channel(&voice);

        let orchestrator = orchestrator_with(voice.clone(), None);
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::FileNotFound);
        // 连接建立过，清理必须执行
        assert_eq!(voice.connect_attempts(), 1);
        assert_eq!(voice.live_connections(), 0);
    }

    #[tokio::test]
    async fn test_sub_event_fires_once_at_threshold_and_is_joined() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        listening_channel(&voice);
        // 流比倒计时长，循环由倒计时退出
        voice.set_play_ticks(1000);

        let fired = Arc::new(AtomicU32::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let fired_in_work = fired.clone();
        let finished_in_work = finished.clone();
        let work = async move {
            fired_in_work.fetch_add(1, Ordering::SeqCst);
            // 工作负载故意拖到主循环结束之后
            tokio::time::sleep(Duration::from_millis(40)).await;
            finished_in_work.store(true, Ordering::SeqCst);
        }
        .boxed();

        let orchestrator = orchestrator_with(voice.clone(), Some(PathBuf::from("/tmp/a.mp3")));
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![SubEvent::new(3, work), SubEvent::empty(5)],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::Completed);
        // 恰好启动一次，且终态返回等到了工作负载完成
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(voice.live_connections(), 0);
    }

    #[tokio::test]
    async fn test_sub_event_joined_even_if_stream_ends_early() {
        let voice = Arc::new(InMemoryVoiceTransport::new());
        listening_channel(&voice);
        // 流在子事件触发后很快结束
        voice.set_play_ticks(6);

        let finished = Arc::new(AtomicBool::new(false));
        let finished_in_work = finished.clone();
        let work = async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            finished_in_work.store(true, Ordering::SeqCst);
        }
        .boxed();

        let orchestrator = orchestrator_with(voice.clone(), Some(PathBuf::from("/tmp/a.mp3")));
        let outcome = orchestrator
            .play(
                &guild(),
                &UserId::new("1"),
                &TrackName::from_stored("a"),
                8,
                vec![SubEvent::new(4, work)],
            )
            .await;

        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert!(finished.load(Ordering::SeqCst));
    }
}
