//! Domain Layer - 领域层
//!
//! 包含:
//! - Track Context: 音轨注册表（每租户一份，global 模板做种子）
//! - Guild Settings: 租户设置记录
//! - 共享标识类型

pub mod guild;
pub mod track;

mod ids;

pub use ids::{ChannelId, GuildId, UserId};
