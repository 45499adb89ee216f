//! Collection Store Port - 租户级集合存储
//!
//! 集合是以名称为键的整文档 JSON 对象。存储以内存为准，
//! 持久化是显式的 flush 操作：replace 之后不 flush 的修改
//! 在本进程内可见，重启后丢失。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

/// 集合值 - 开放形状的 JSON 对象
pub type Collection = serde_json::Map<String, serde_json::Value>;

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("Persist error: {0}")]
    Persist(String),

    #[error("Manifest corrupt: {0}")]
    ManifestCorrupt(String),
}

/// Collection Store Port
///
/// 每进程恰有一个实现实例持有全部集合。
#[async_trait]
pub trait CollectionStorePort: Send + Sync {
    /// 建立集合：未知名称时创建空集合、登记 manifest 并立即持久化两者。
    /// 对已知名称重复调用是无操作。
    async fn ensure(&self, name: &str) -> Result<(), StoreError>;

    /// 读取内存中集合的副本；未建立的名称返回 NotFound
    fn get(&self, name: &str) -> Result<Collection, StoreError>;

    /// 整体替换内存值；未知名称时静默无操作（调用方须先 ensure）。
    /// 本身不持久化。
    fn replace(&self, name: &str, collection: Collection);

    /// 将内存值序列化到磁盘，整体覆盖旧内容。
    /// 失败时内存状态不受影响，调用方可重试。
    async fn flush(&self, name: &str) -> Result<(), StoreError>;

    /// 获取该集合的互斥范围
    ///
    /// 读-改-写序列（get → replace → flush）必须在持有此 guard 的
    /// 范围内进行，避免并发处理器之间的更新丢失。
    async fn guard(&self, name: &str) -> OwnedMutexGuard<()>;

    /// 集合是否已建立
    fn contains(&self, name: &str) -> bool;

    /// 已建立的集合名称
    fn names(&self) -> Vec<String>;
}
