//! Application Layer - 应用层
//!
//! - Ports: 聊天连接器、语音传输、音频文件库、集合存储的抽象接口
//! - Registry: 每租户音轨注册表的访问服务
//! - Playback: 播放编排器
//! - Commands: 命令表、路由与处理器

pub mod commands;
pub mod error;
pub mod playback;
pub mod ports;
pub mod registry;

pub use error::ApplicationError;
