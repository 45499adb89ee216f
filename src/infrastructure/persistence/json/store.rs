//! JSON Collection Store Implementation
//!
//! 内存中的集合映射是运行期的事实来源；文件只是 flush 目标。
//! 装载时与磁盘对账：清单里列出但文件缺失/损坏的集合被丢弃，
//! 对账后的清单在装载返回前落盘。

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::manifest::{Manifest, MANIFEST_FILE};
use crate::application::ports::{Collection, CollectionStorePort, StoreError};

/// 集合文件扩展名
const COLLECTION_FILE_EXT: &str = "dat";

/// 文件型集合存储
#[derive(Debug)]
pub struct JsonCollectionStore {
    dir: PathBuf,
    collections: DashMap<String, Collection>,
    /// 每集合的互斥范围（guard 端口）
    locks: DashMap<String, Arc<Mutex<()>>>,
    manifest: Mutex<Manifest>,
}

impl JsonCollectionStore {
    /// 创建存储并执行一次装载对账
    ///
    /// 目录不存在时创建。清单缺失视为全新存储；清单损坏是致命的
    /// （进程不应在不健康的持久化之上继续）。
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Persist(format!("could not create store dir: {}", e)))?;

        let store = Self {
            dir,
            collections: DashMap::new(),
            locks: DashMap::new(),
            manifest: Mutex::new(Manifest::new()),
        };
        store.load().await?;
        Ok(store)
    }

    /// 装载清单列出的所有集合
    async fn load(&self) -> Result<(), StoreError> {
        let listed = self.read_manifest().await?;

        let mut loaded = Vec::new();
        for name in listed {
            match self.read_collection_file(&name).await {
                Ok(collection) => {
                    self.collections.insert(name.clone(), collection);
                    loaded.push(name);
                }
                // 缺失或损坏：丢弃，不重试
                Err(e) => {
                    tracing::warn!(
                        collection = %name,
                        error = %e,
                        "Dropping collection that failed to load"
                    );
                }
            }
        }

        // 对账后的清单先落盘再返回
        let reconciled = Manifest::from_names(loaded);
        self.write_manifest(&reconciled).await?;
        tracing::info!(count = reconciled.count, "Collection store loaded");
        *self.manifest.lock().await = reconciled;

        Ok(())
    }

    async fn read_manifest(&self) -> Result<Vec<String>, StoreError> {
        let path = self.dir.join(MANIFEST_FILE);

        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            // 清单缺失：全新存储
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(dir = ?self.dir, "No manifest found, starting fresh store");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StoreError::Persist(format!("error reading manifest: {}", e)));
            }
        };

        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| StoreError::ManifestCorrupt(format!("cannot parse manifest: {}", e)))?;
        manifest.validate().map_err(StoreError::ManifestCorrupt)?;

        Ok(manifest.list)
    }

    async fn read_collection_file(&self, name: &str) -> Result<Collection, StoreError> {
        let path = self.collection_path(name);
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| StoreError::Persist(format!("error reading {}: {}", name, e)))?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| StoreError::Persist(format!("error parsing {}: {}", name, e)))?;

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::Persist(format!(
                "collection {} is not a JSON object",
                name
            ))),
        }
    }

    async fn write_collection(&self, name: &str, collection: &Collection) -> Result<(), StoreError> {
        let text = serde_json::to_string(collection)
            .map_err(|e| StoreError::Persist(format!("error serializing {}: {}", name, e)))?;

        fs::write(self.collection_path(name), text)
            .await
            .map_err(|e| StoreError::Persist(format!("error writing collection {}: {}", name, e)))
    }

    async fn write_manifest(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let text = serde_json::to_string(manifest)
            .map_err(|e| StoreError::Persist(format!("error serializing manifest: {}", e)))?;

        fs::write(self.dir.join(MANIFEST_FILE), text)
            .await
            .map_err(|e| StoreError::Persist(format!("error writing manifest: {}", e)))
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, COLLECTION_FILE_EXT))
    }
}

#[async_trait]
impl CollectionStorePort for JsonCollectionStore {
    async fn ensure(&self, name: &str) -> Result<(), StoreError> {
        if self.collections.contains_key(name) {
            return Ok(());
        }

        let empty = Collection::new();
        self.collections.insert(name.to_string(), empty.clone());
        self.write_collection(name, &empty).await?;

        let mut manifest = self.manifest.lock().await;
        manifest.push(name);
        self.write_manifest(&manifest).await?;

        tracing::info!(collection = %name, "Collection established");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Collection, StoreError> {
        self.collections
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn replace(&self, name: &str, collection: Collection) {
        // 未建立的名称静默无操作：调用方必须先 ensure
        if let Some(mut entry) = self.collections.get_mut(name) {
            *entry = collection;
        }
    }

    async fn flush(&self, name: &str) -> Result<(), StoreError> {
        let snapshot = self
            .collections
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        self.write_collection(name, &snapshot).await?;
        tracing::debug!(collection = %name, entries = snapshot.len(), "Collection flushed");
        Ok(())
    }

    async fn guard(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    fn names(&self) -> Vec<String> {
        self.collections.iter().map(|e| e.key().clone()).collect()
    }
}
