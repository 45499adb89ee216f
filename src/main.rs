//! Clipcast - 多租户 soundboard 服务
//!
//! 启动顺序: 配置 → 日志 → 集合存储装载 → 基础集合 → 形状迁移 →
//! 端口适配器 → 命令表/路由 → 控制台消息泵。
//!
//! 本地运行时用内存聊天/语音适配器驱动：stdin 的每一行作为
//! operator 的一条消息进入路由。

use std::sync::Arc;

use clipcast::application::commands::{CommandHandlers, CommandRouter, CommandTable};
use clipcast::application::playback::{PlaybackConfig, PlaybackOrchestrator};
use clipcast::application::ports::{ChatMessage, CollectionStorePort};
use clipcast::application::registry::{global_collection, TrackRegistryService};
use clipcast::config::{load_config, print_config};
use clipcast::domain::guild::GUILD_COLLECTION;
use clipcast::domain::{ChannelId, GuildId, UserId};
use clipcast::infrastructure::adapters::{
    FileAudioLibrary, InMemoryChatConnector, InMemoryVoiceTransport,
};
use clipcast::infrastructure::JsonCollectionStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!("{},clipcast={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Clipcast - multi-tenant soundboard");
    print_config(&config);

    // 音频目录（构造时确保目录存在）
    let library = Arc::new(
        FileAudioLibrary::from_config(&config.audio)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to prepare audio dirs: {}", e))?,
    );

    // 集合存储：装载 + 对账；清单损坏在这里终止进程
    let store: Arc<JsonCollectionStore> = Arc::new(
        JsonCollectionStore::new(&config.storage.data_dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load collection store: {}", e))?,
    );

    // 基础集合
    store.ensure(GUILD_COLLECTION).await?;
    store.ensure(&global_collection()).await?;

    // 旧版注册表形状的一次性迁移
    let registry = TrackRegistryService::new(store.clone());
    let migrated = registry.migrate_all().await?;
    if migrated > 0 {
        tracing::info!(migrated = migrated, "Registry collections migrated");
    }

    // 命令表（function 引用在这里校验，未知引用直接失败）
    let table = CommandTable::load(&config.bot.commands_file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load command table: {}", e))?;
    tracing::info!(commands = table.len(), "Command table loaded");

    // 本地运行时的端口适配器
    let chat = Arc::new(InMemoryChatConnector::new());
    let voice = Arc::new(InMemoryVoiceTransport::new());

    let orchestrator = PlaybackOrchestrator::new(
        voice.clone(),
        library.clone(),
        PlaybackConfig::from_audio(&config.audio),
    );

    let handlers = Arc::new(CommandHandlers::new(
        &config,
        table.clone(),
        chat.clone(),
        voice.clone(),
        library,
        store.clone(),
        TrackRegistryService::new(store.clone()),
        orchestrator,
    ));

    let router = Arc::new(CommandRouter::new(
        table,
        store,
        chat,
        handlers,
        config.bot.prefix_char(),
        config.bot.admin_ids.clone(),
    ));

    // 控制台消息泵：stdin 的每行作为 operator 的消息
    let operator = config
        .bot
        .admin_ids
        .first()
        .cloned()
        .unwrap_or_else(|| "operator".to_string());
    let token = CancellationToken::new();

    let pump_token = token.clone();
    let pump_router = router.clone();
    let pump = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                _ = pump_token.cancelled() => break,
                line = lines.next_line() => {
                    match line {
                        Ok(Some(content)) => {
                            let msg = ChatMessage {
                                guild_id: GuildId::new("local"),
                                channel_id: ChannelId::new("console"),
                                author_id: UserId::new(operator.clone()),
                                author_display_name: "operator".to_string(),
                                content,
                                attachments: Vec::new(),
                            };
                            pump_router.on_message(msg).await;
                        }
                        Ok(None) => break,
                        Err(e) => {
                            tracing::error!(error = %e, "Console read failed");
                            break;
                        }
                    }
                }
            }
        }
    });

    tracing::info!("Bot is ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");
    token.cancel();
    let _ = pump.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
