//! Command Router - 入站消息路由
//!
//! 消息入口：补建租户设置记录，剥前缀，查表（别名、禁用、权限、
//! 参数下限），然后把处理器派发为独立任务。

use std::sync::Arc;

use super::table::{CommandEntry, CommandTable};
use super::CommandHandlers;
use crate::application::error::ApplicationError;
use crate::application::ports::{ChatConnectorPort, ChatMessage, CollectionStorePort};
use crate::domain::guild::{GuildSettings, GUILD_COLLECTION};
use crate::domain::GuildId;

/// 命令路由器
pub struct CommandRouter {
    table: CommandTable,
    store: Arc<dyn CollectionStorePort>,
    chat: Arc<dyn ChatConnectorPort>,
    handlers: Arc<CommandHandlers>,
    default_prefix: char,
    admin_ids: Vec<String>,
}

impl CommandRouter {
    pub fn new(
        table: CommandTable,
        store: Arc<dyn CollectionStorePort>,
        chat: Arc<dyn ChatConnectorPort>,
        handlers: Arc<CommandHandlers>,
        default_prefix: char,
        admin_ids: Vec<String>,
    ) -> Self {
        Self {
            table,
            store,
            chat,
            handlers,
            default_prefix,
            admin_ids,
        }
    }

    /// 处理一条入站消息
    pub async fn on_message(&self, msg: ChatMessage) {
        let prefix = match self.ensure_guild(&msg.guild_id).await {
            Ok(prefix) => prefix,
            Err(e) => {
                tracing::error!(guild_id = %msg.guild_id, error = %e, "Guild bootstrap failed");
                return;
            }
        };

        let content = msg.content.trim();
        let mut chars = content.chars();

        // 命令形状：前缀开头、长度大于 1、前缀后不是空格
        if chars.next() != Some(prefix) {
            return;
        }
        match chars.next() {
            None | Some(' ') => return,
            Some(_) => {}
        }

        let body = &content[prefix.len_utf8()..];
        let mut tokens = body.split_whitespace();
        let Some(command_token) = tokens.next() else {
            return;
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        // 表查找（含别名）；未声明的命令直接忽略
        let Some((name, entry)) = self.table.resolve(command_token) else {
            return;
        };

        if entry.spec.disabled {
            return;
        }

        if !self.permitted(entry, &msg) {
            let _ = self
                .chat
                .send_text(
                    &msg.channel_id,
                    &format!("You are not authorized to run command `{}`", name),
                )
                .await;
            return;
        }

        // 参数下限
        if args.len() < entry.spec.argmin {
            if !entry.spec.usage.is_empty() {
                let _ = self
                    .chat
                    .send_text(
                        &msg.channel_id,
                        &format!("Usage: `{}{} {}`", prefix, name, entry.spec.usage),
                    )
                    .await;
            }
            return;
        }

        tracing::debug!(
            guild_id = %msg.guild_id,
            user = %msg.author_display_name,
            command = name,
            "Dispatching command"
        );

        // 处理器作为独立任务运行，互不阻塞
        let handlers = self.handlers.clone();
        let id = entry.id;
        tokio::spawn(async move {
            handlers.dispatch(id, msg, args).await;
        });
    }

    /// 权限检查：只识别 admin 标签，对照运维白名单
    fn permitted(&self, entry: &CommandEntry, msg: &ChatMessage) -> bool {
        if entry.spec.permission.eq_ignore_ascii_case("admin") {
            return self
                .admin_ids
                .iter()
                .any(|id| id == msg.author_id.as_str());
        }
        true
    }

    /// 首次见到的租户补建设置记录，返回其前缀
    async fn ensure_guild(&self, guild: &GuildId) -> Result<char, ApplicationError> {
        let _guard = self.store.guard(GUILD_COLLECTION).await;
        self.store.ensure(GUILD_COLLECTION).await?;

        let mut collection = self.store.get(GUILD_COLLECTION)?;

        if let Some(raw) = collection.get(guild.as_str()) {
            if let Ok(settings) = serde_json::from_value::<GuildSettings>(raw.clone()) {
                return Ok(settings.prefix);
            }
            tracing::warn!(guild_id = %guild, "Guild record unreadable, rewriting");
        } else {
            tracing::info!(guild_id = %guild, "First time guild, creating record");
        }

        let settings = GuildSettings::new(self.default_prefix);
        let value = serde_json::to_value(&settings)
            .map_err(|e| ApplicationError::internal(e.to_string()))?;
        collection.insert(guild.as_str().to_string(), value);

        self.store.replace(GUILD_COLLECTION, collection);
        self.store.flush(GUILD_COLLECTION).await?;

        Ok(settings.prefix)
    }
}
