//! Track Context - 音轨限界上下文
//!
//! 职责:
//! - 音轨记录（名称 + outro 绑定）
//! - 每租户注册表聚合与单归属 outro 不变量
//! - 旧版存储形状的一次性迁移

mod errors;
mod migration;
mod registry;
mod value_objects;

pub use errors::TrackError;
pub use migration::{migrate_registry, MigrationOutcome};
pub use registry::{TrackRecord, TrackRegistry, REGISTRY_VERSION};
pub use value_objects::{OutroBinding, TrackName};
