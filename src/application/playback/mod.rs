//! Playback - 播放编排
//!
//! 一次播放 = 目标解析 + 连接生命周期 + 有界轮询循环 + 定时子事件。

mod orchestrator;
mod target;

pub use orchestrator::PlaybackOrchestrator;
pub use target::resolve_target;

use futures_util::future::BoxFuture;
use std::time::Duration;

use crate::config::AudioConfig;

/// 一次播放尝试的终态
///
/// 编排器的正常返回值，不是错误；由调用方决定用户可见的反馈。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// 播放完成（含倒计时耗尽与流提前结束）
    Completed,
    /// 没有可用的目标频道
    NoTarget,
    /// 目标频道已有活动连接，良性跳过
    AlreadyConnected,
    /// 连接超时
    ConnectTimeout,
    /// 两个音频目录都没有该片段文件
    FileNotFound,
    /// 其他失败（连接被拒、流启动失败等）
    Aborted,
}

/// 定时子事件
///
/// `at` 是剩余时间阈值：剩余 tick 数首次 <= at 的那个 tick 上启动。
/// 检查发生在每个 tick 的睡眠之前，因此阈值 0 永远不会触发
/// （循环在剩余归零时先退出）。缺少工作负载的子事件直接丢弃。
pub struct SubEvent {
    pub at: u32,
    pub work: Option<BoxFuture<'static, ()>>,
}

impl SubEvent {
    pub fn new(at: u32, work: BoxFuture<'static, ()>) -> Self {
        Self {
            at,
            work: Some(work),
        }
    }

    /// 无工作负载的条目（到达阈值时被丢弃，不运行）
    pub fn empty(at: u32) -> Self {
        Self { at, work: None }
    }
}

/// 播放参数
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// 轮询 tick 间隔
    pub tick: Duration,
    /// 连接超时
    pub connect_deadline: Duration,
    /// 普通播放的倒计时（tick 数）
    pub sound_timeout: u32,
    /// outro 播放的倒计时（tick 数）
    pub outro_timeout: u32,
}

impl PlaybackConfig {
    pub fn from_audio(audio: &AudioConfig) -> Self {
        Self {
            tick: Duration::from_millis(audio.tick_ms),
            connect_deadline: Duration::from_millis(audio.connect_timeout_ms),
            sound_timeout: audio.timeout_seconds,
            outro_timeout: audio.outro_timeout_seconds,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            connect_deadline: Duration::from_secs(2),
            sound_timeout: 8,
            outro_timeout: 8,
        }
    }
}
