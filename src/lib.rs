//! Clipcast - 多租户 soundboard 服务
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Track Context: 音轨注册表（每租户一份 + global 种子模板）
//! - Guild Settings: 租户设置记录
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ChatConnector, VoiceTransport, AudioLibrary, CollectionStore）
//! - Registry: 注册表访问服务（播种、迁移、互斥读改写）
//! - Playback: 播放编排器（目标解析、连接生命周期、定时子事件）
//! - Commands: 命令表 + 路由 + 处理器
//!
//! 基础设施层 (infrastructure/):
//! - Persistence: JSON 文件集合存储（manifest + *.dat）
//! - Adapters: 文件音频库、内存聊天/语音适配器

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
