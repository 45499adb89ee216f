//! 播放目标解析
//!
//! 确定性规则，依次:
//! 1. 请求者有语音会话但无频道 → 无目标（静默）
//! 2. 请求者在某个频道 → 该频道
//! 3. 按稳定顺序扫描租户语音频道，取第一个含非自聋参与者的频道

use crate::application::ports::VoiceTransportPort;
use crate::domain::{ChannelId, GuildId, UserId};

pub fn resolve_target(
    voice: &dyn VoiceTransportPort,
    guild: &GuildId,
    requester: &UserId,
) -> Option<ChannelId> {
    match voice.voice_presence(guild, requester) {
        // 有会话：跟随请求者的频道（可能为 None，即无目标）
        Some(presence) => presence.channel,

        // 无会话：找别人正在听的频道
        None => voice
            .voice_channels(guild)
            .into_iter()
            .find(|channel| channel.participants.iter().any(|p| !p.self_deaf))
            .map(|channel| channel.id),
    }
}
