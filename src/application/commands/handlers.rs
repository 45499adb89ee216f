//! Command Handlers - 命令处理器
//!
//! 每个处理器是 `(消息, 参数) -> ()`：用户可见的反馈全部经
//! 聊天连接器发送，失败只记日志，绝不让进程崩溃。

use futures_util::FutureExt;
use std::sync::Arc;

use super::table::{CommandId, CommandTable};
use crate::application::error::ApplicationError;
use crate::application::playback::{PlaybackConfig, PlaybackOrchestrator, SubEvent};
use crate::application::ports::{
    Attachment, AudioLibraryPort, ChatConnectorPort, ChatMessage, CollectionStorePort,
    VoiceTransportPort,
};
use crate::application::registry::TrackRegistryService;
use crate::config::AppConfig;
use crate::domain::guild::{GuildSettings, GUILD_COLLECTION};
use crate::domain::track::{TrackError, TrackName, TrackRecord};
use crate::domain::{ChannelId, GuildId};

/// 命令处理器集合
pub struct CommandHandlers {
    chat: Arc<dyn ChatConnectorPort>,
    voice: Arc<dyn VoiceTransportPort>,
    library: Arc<dyn AudioLibraryPort>,
    store: Arc<dyn CollectionStorePort>,
    registry: TrackRegistryService,
    orchestrator: PlaybackOrchestrator,
    table: CommandTable,
    playback: PlaybackConfig,

    title: String,
    default_prefix: char,
    accepted_types: Vec<String>,
    outro_dc_at: u32,
}

impl CommandHandlers {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        table: CommandTable,
        chat: Arc<dyn ChatConnectorPort>,
        voice: Arc<dyn VoiceTransportPort>,
        library: Arc<dyn AudioLibraryPort>,
        store: Arc<dyn CollectionStorePort>,
        registry: TrackRegistryService,
        orchestrator: PlaybackOrchestrator,
    ) -> Self {
        Self {
            chat,
            voice,
            library,
            store,
            registry,
            orchestrator,
            table,
            playback: PlaybackConfig::from_audio(&config.audio),
            title: config.bot.title.clone(),
            default_prefix: config.bot.prefix_char(),
            accepted_types: config.audio.accepted_types.clone(),
            outro_dc_at: config.audio.outro_user_dc_seconds,
        }
    }

    /// 按标识派发；处理器错误只记日志
    pub async fn dispatch(&self, id: CommandId, msg: ChatMessage, args: Vec<String>) {
        let result = match id {
            CommandId::Sound => self.sound(&msg, &args).await,
            CommandId::Add => self.add(&msg, &args).await,
            CommandId::Remove => self.remove(&msg, &args).await,
            CommandId::List => self.list(&msg).await,
            CommandId::SetOutro => self.set_outro(&msg, &args).await,
            CommandId::Outro => self.outro(&msg).await,
            CommandId::SetPrefix => self.set_prefix(&msg, &args).await,
            CommandId::Help => self.help(&msg).await,
        };

        if let Err(e) = result {
            tracing::error!(command = ?id, error = %e, "Command handler failed");
        }
    }

    /// 播放已登记的片段
    async fn sound(&self, msg: &ChatMessage, args: &[String]) -> Result<(), ApplicationError> {
        let Ok(name) = TrackName::from_args(args) else {
            return self.say(&msg.channel_id, "Please name the sound you want to hear").await;
        };

        let registry = self.registry.snapshot(&msg.guild_id).await?;
        if !registry.contains(name.as_str()) {
            return self
                .say(
                    &msg.channel_id,
                    &format!("I don't know the sound `{}`", name),
                )
                .await;
        }

        let outcome = self
            .orchestrator
            .play(
                &msg.guild_id,
                &msg.author_id,
                &name,
                self.playback.sound_timeout,
                vec![],
            )
            .await;

        tracing::debug!(guild_id = %msg.guild_id, track = %name, outcome = ?outcome, "Sound playback finished");
        Ok(())
    }

    /// 登记新片段（附件来自本消息或频道最近的消息）
    async fn add(&self, msg: &ChatMessage, args: &[String]) -> Result<(), ApplicationError> {
        let Ok(name) = TrackName::from_args(args) else {
            return self.say(&msg.channel_id, "Please include a name for this sound!").await;
        };

        let Some(attachment) = self.find_attachment(msg).await? else {
            let prefix = self.tenant_prefix(&msg.guild_id);
            return self
                .say(
                    &msg.channel_id,
                    &format!("Send an audio file in chat, then type `{}add [name]`", prefix),
                )
                .await;
        };

        match attachment.type_parts() {
            Some(("audio", sub)) if self.accepted_types.iter().any(|t| t == sub) => {}
            Some((_, sub)) => {
                return self
                    .say(
                        &msg.channel_id,
                        &format!("Unsupported file type '{}'", sub),
                    )
                    .await;
            }
            None => {
                return self
                    .say(
                        &msg.channel_id,
                        &format!("Unsupported file type '{}'", attachment.content_type),
                    )
                    .await;
            }
        }

        // 覆盖已有片段是被禁止的
        let registry = self.registry.snapshot(&msg.guild_id).await?;
        if registry.contains(name.as_str()) {
            return self
                .say(
                    &msg.channel_id,
                    &format!("Cannot overwrite existing sound `{}`", name),
                )
                .await;
        }

        let bytes = self.chat.download(&attachment).await?;
        self.library
            .save(&msg.guild_id, name.as_str(), &bytes)
            .await
            .map_err(|e| ApplicationError::internal(e.to_string()))?;

        let inserted = self
            .registry
            .mutate(&msg.guild_id, |reg| {
                reg.insert(TrackRecord::new(name.as_str()))
            })
            .await?;

        match inserted {
            Ok(()) => {
                tracing::info!(guild_id = %msg.guild_id, track = %name, "Track added");
                self.say(
                    &msg.channel_id,
                    &format!("Added new sound `{}`", name),
                )
                .await
            }
            // 与并发 add 撞车
            Err(_) => {
                self.say(
                    &msg.channel_id,
                    &format!("Cannot overwrite existing sound `{}`", name),
                )
                .await
            }
        }
    }

    /// 删除片段文件与列表项
    async fn remove(&self, msg: &ChatMessage, args: &[String]) -> Result<(), ApplicationError> {
        let Ok(name) = TrackName::from_args(args) else {
            return self.say(&msg.channel_id, "Please name the sound you want to remove").await;
        };

        let registry = self.registry.snapshot(&msg.guild_id).await?;
        if !registry.contains(name.as_str()) {
            return self
                .say(
                    &msg.channel_id,
                    &format!("I don't know the sound `{}`", name),
                )
                .await;
        }

        let tenant_file = self.library.tenant_path(&msg.guild_id, name.as_str());

        if !tenant_file.exists() {
            if self.library.common_path(name.as_str()).exists() {
                // 共享片段不属于任何租户
                return self
                    .say(
                        &msg.channel_id,
                        &format!("Sound is global, cannot delete `{}`", name),
                    )
                    .await;
            }

            // 文件早已不在，清掉挂空的列表项
            tracing::error!(guild_id = %msg.guild_id, track = %name, "Clip file missing, dropping listing");
            self.registry
                .mutate(&msg.guild_id, |reg| {
                    reg.remove(name.as_str());
                })
                .await?;
            return self
                .say(
                    &msg.channel_id,
                    &format!("Sound file not found, removed the listing for `{}`", name),
                )
                .await;
        }

        match self.library.delete(&msg.guild_id, name.as_str()).await {
            Ok(()) => {
                self.registry
                    .mutate(&msg.guild_id, |reg| {
                        reg.remove(name.as_str());
                    })
                    .await?;
                self.say(&msg.channel_id, &format!("Removed `{}`", name)).await
            }
            // 删除失败时保留列表项，下次还能重试
            Err(e) => {
                tracing::error!(guild_id = %msg.guild_id, track = %name, error = %e, "Unable to remove clip file");
                self.say(
                    &msg.channel_id,
                    &format!("Unable to remove file for track `{}`", name),
                )
                .await
            }
        }
    }

    /// 列出已登记的片段
    async fn list(&self, msg: &ChatMessage) -> Result<(), ApplicationError> {
        let registry = self.registry.snapshot(&msg.guild_id).await?;

        if registry.is_empty() {
            let prefix = self.tenant_prefix(&msg.guild_id);
            return self
                .say(
                    &msg.channel_id,
                    &format!(
                        "No sounds stored! Upload an mp3, then type `{}add [name]` to add one.",
                        prefix
                    ),
                )
                .await;
        }

        let lines: Vec<String> = registry
            .records()
            .iter()
            .map(|(name, record)| {
                if record.outro.is_empty() {
                    name.clone()
                } else {
                    let owners = record
                        .outro
                        .values()
                        .map(|binding| binding.display_name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{} (outro for: `{}`)", name, owners)
                }
            })
            .collect();

        self.chat
            .send_embed(&msg.channel_id, "Tracks", &lines.join("\n"))
            .await?;
        Ok(())
    }

    /// 绑定调用者的 outro
    async fn set_outro(&self, msg: &ChatMessage, args: &[String]) -> Result<(), ApplicationError> {
        let Ok(name) = TrackName::from_args(args) else {
            return self.say(&msg.channel_id, "Please name the sound you want as your outro").await;
        };

        let result = self
            .registry
            .mutate(&msg.guild_id, |reg| {
                reg.set_outro(&name, &msg.author_id, &msg.author_display_name)
            })
            .await?;

        match result {
            Ok(()) => {
                tracing::info!(
                    guild_id = %msg.guild_id,
                    user = %msg.author_display_name,
                    user_id = %msg.author_id,
                    track = %name,
                    "Outro set"
                );
                self.say(
                    &msg.channel_id,
                    &format!(
                        "Set user `{}` outro to `{}`",
                        msg.author_display_name, name
                    ),
                )
                .await
            }
            Err(TrackError::UnknownTrack(_)) => {
                self.say(
                    &msg.channel_id,
                    &format!("I don't know the sound `{}`", name),
                )
                .await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 播放调用者的 outro，并调度断开该用户的子事件
    async fn outro(&self, msg: &ChatMessage) -> Result<(), ApplicationError> {
        let registry = self.registry.snapshot(&msg.guild_id).await?;

        let Some(record) = registry.outro_track(&msg.author_id) else {
            let prefix = self.tenant_prefix(&msg.guild_id);
            return self
                .say(
                    &msg.channel_id,
                    &format!(
                        "No outro set for you, {}. Use `{}setoutro [sound name]` to set your outro sound.",
                        msg.author_display_name, prefix
                    ),
                )
                .await;
        };

        let track = TrackName::from_stored(record.name.clone());

        let voice = self.voice.clone();
        let guild = msg.guild_id.clone();
        let user = msg.author_id.clone();
        let work = async move {
            if let Err(e) = voice.disconnect_user(&guild, &user).await {
                tracing::warn!(guild_id = %guild, user_id = %user, error = %e, "Outro disconnect failed");
            }
        }
        .boxed();

        let outcome = self
            .orchestrator
            .play(
                &msg.guild_id,
                &msg.author_id,
                &track,
                self.playback.outro_timeout,
                vec![SubEvent::new(self.outro_dc_at, work)],
            )
            .await;

        tracing::debug!(guild_id = %msg.guild_id, track = %track, outcome = ?outcome, "Outro playback finished");
        Ok(())
    }

    /// 更新租户前缀（admin）
    async fn set_prefix(&self, msg: &ChatMessage, args: &[String]) -> Result<(), ApplicationError> {
        let prefix = match args.first() {
            Some(arg) => {
                let mut chars = arg.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => {
                        return self
                            .say(&msg.channel_id, "Please specify a single-character prefix")
                            .await;
                    }
                }
            }
            None => {
                return self
                    .say(&msg.channel_id, "Please specify a single-character prefix")
                    .await;
            }
        };

        let _guard = self.store.guard(GUILD_COLLECTION).await;
        self.store.ensure(GUILD_COLLECTION).await?;
        let mut collection = self.store.get(GUILD_COLLECTION)?;

        let mut settings = collection
            .get(msg.guild_id.as_str())
            .cloned()
            .and_then(|raw| serde_json::from_value::<GuildSettings>(raw).ok())
            .unwrap_or_else(|| GuildSettings::new(self.default_prefix));
        settings.prefix = prefix;

        let value = serde_json::to_value(&settings)
            .map_err(|e| ApplicationError::internal(e.to_string()))?;
        collection.insert(msg.guild_id.as_str().to_string(), value);

        self.store.replace(GUILD_COLLECTION, collection);
        self.store.flush(GUILD_COLLECTION).await?;

        tracing::info!(guild_id = %msg.guild_id, prefix = %prefix, "Guild prefix updated");
        Ok(())
    }

    /// 帮助文本：所有启用且无权限要求的命令
    async fn help(&self, msg: &ChatMessage) -> Result<(), ApplicationError> {
        let prefix = self.tenant_prefix(&msg.guild_id);

        let lines: Vec<String> = self
            .table
            .iter()
            .filter(|(_, entry)| {
                !entry.spec.disabled && entry.spec.permission.eq_ignore_ascii_case("any")
            })
            .map(|(name, entry)| {
                format!(
                    "**{}**: {}\n`{}{} {}`",
                    name, entry.spec.desc, prefix, name, entry.spec.usage
                )
            })
            .collect();

        self.chat
            .send_embed(
                &msg.channel_id,
                &format!("{} help:", self.title),
                &lines.join("\n"),
            )
            .await?;
        Ok(())
    }

    /// 本消息的附件优先，其次频道最近两条消息
    async fn find_attachment(
        &self,
        msg: &ChatMessage,
    ) -> Result<Option<Attachment>, ApplicationError> {
        if let Some(attachment) = msg.attachments.first() {
            return Ok(Some(attachment.clone()));
        }

        let recent = self.chat.recent_attachments(&msg.channel_id, 2).await?;
        Ok(recent.into_iter().next())
    }

    /// 某租户当前的前缀（提示文案用；任何失败都退回默认值）
    fn tenant_prefix(&self, guild: &GuildId) -> char {
        self.store
            .get(GUILD_COLLECTION)
            .ok()
            .and_then(|collection| collection.get(guild.as_str()).cloned())
            .and_then(|raw| serde_json::from_value::<GuildSettings>(raw).ok())
            .map(|settings| settings.prefix)
            .unwrap_or(self.default_prefix)
    }

    async fn say(&self, channel: &ChannelId, text: &str) -> Result<(), ApplicationError> {
        self.chat.send_text(channel, text).await?;
        Ok(())
    }
}
