//! Track Registry Service - 注册表访问服务
//!
//! 每租户一个注册表集合，全局模板集合做首次播种的种子。
//! 所有读-改-写序列都在该集合的互斥范围内进行。

use serde_json::Value;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{Collection, CollectionStorePort};
use crate::domain::track::{migrate_registry, TrackRegistry};
use crate::domain::GuildId;

/// 注册表集合名前缀
pub const TRACKS_COLLECTION_PREFIX: &str = "tracks";

/// 保留的全局租户名
pub const GLOBAL_TENANT: &str = "global";

/// 某租户的注册表集合名
pub fn registry_collection(guild: &GuildId) -> String {
    format!("{}-{}", TRACKS_COLLECTION_PREFIX, guild)
}

/// 全局种子模板的集合名
pub fn global_collection() -> String {
    format!("{}-{}", TRACKS_COLLECTION_PREFIX, GLOBAL_TENANT)
}

/// 注册表服务
pub struct TrackRegistryService {
    store: Arc<dyn CollectionStorePort>,
}

impl TrackRegistryService {
    pub fn new(store: Arc<dyn CollectionStorePort>) -> Self {
        Self { store }
    }

    /// 读取某租户注册表的快照（首次接触时先播种）
    pub async fn snapshot(&self, guild: &GuildId) -> Result<TrackRegistry, ApplicationError> {
        let name = registry_collection(guild);
        let _guard = self.store.guard(&name).await;
        self.load_locked(guild, &name).await
    }

    /// 互斥范围内的读-改-写
    ///
    /// 闭包的返回值原样传出；闭包执行后整体替换并 flush。
    pub async fn mutate<F, R>(&self, guild: &GuildId, f: F) -> Result<R, ApplicationError>
    where
        F: FnOnce(&mut TrackRegistry) -> R,
    {
        let name = registry_collection(guild);
        let _guard = self.store.guard(&name).await;

        let mut registry = self.load_locked(guild, &name).await?;
        let out = f(&mut registry);

        self.store.replace(&name, to_collection(&registry)?);
        self.store.flush(&name).await?;

        Ok(out)
    }

    /// 启动时的一次性形状迁移
    ///
    /// 扫描所有注册表集合（含全局模板），把旧形状升级为当前版本；
    /// 只回写发生过改动的集合。返回改动数量。
    pub async fn migrate_all(&self) -> Result<usize, ApplicationError> {
        let prefix = format!("{}-", TRACKS_COLLECTION_PREFIX);
        let mut changed = 0;

        for name in self.store.names() {
            if !name.starts_with(&prefix) {
                continue;
            }

            let _guard = self.store.guard(&name).await;
            let raw = self.store.get(&name)?;
            let (outcome, replacement) = migrate_registry(&raw);

            if let Some(upgraded) = replacement {
                self.store.replace(&name, upgraded);
                self.store.flush(&name).await?;
                changed += 1;
                tracing::info!(collection = %name, outcome = ?outcome, "Registry shape migrated");
            }
        }

        Ok(changed)
    }

    /// 持有 guard 的前提下加载注册表
    ///
    /// 集合缺少 `tracks` 键视为未播种：以全局模板的值拷贝播种并立即落盘。
    async fn load_locked(
        &self,
        guild: &GuildId,
        name: &str,
    ) -> Result<TrackRegistry, ApplicationError> {
        self.store.ensure(name).await?;
        let raw = self.store.get(name)?;

        if !raw.contains_key("tracks") {
            let seeded = self.seed_template();
            tracing::info!(
                guild_id = %guild,
                seeded_tracks = seeded.len(),
                "First touch for guild, seeding registry"
            );

            self.store.replace(name, to_collection(&seeded)?);
            self.store.flush(name).await?;
            return Ok(seeded);
        }

        serde_json::from_value(Value::Object(raw))
            .map_err(|e| ApplicationError::internal(format!("registry parse failed: {}", e)))
    }

    /// 全局模板的独立拷贝；模板缺失或不可读时为空注册表
    fn seed_template(&self) -> TrackRegistry {
        let global = global_collection();
        if !self.store.contains(&global) {
            return TrackRegistry::new();
        }

        match self.store.get(&global) {
            Ok(raw) if raw.contains_key("tracks") => {
                serde_json::from_value(Value::Object(raw)).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Global template unreadable, seeding empty");
                    TrackRegistry::new()
                })
            }
            _ => TrackRegistry::new(),
        }
    }
}

/// 注册表 → 集合值
fn to_collection(registry: &TrackRegistry) -> Result<Collection, ApplicationError> {
    match serde_json::to_value(registry) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApplicationError::internal(
            "registry did not serialize to an object",
        )),
        Err(e) => Err(ApplicationError::internal(format!(
            "registry serialize failed: {}",
            e
        ))),
    }
}
