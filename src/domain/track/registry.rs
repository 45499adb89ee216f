//! Track Context - Aggregate Root

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{OutroBinding, TrackError, TrackName};
use crate::domain::UserId;

/// 注册表存储形状版本号
pub const REGISTRY_VERSION: u32 = 2;

/// 音轨记录
///
/// `outro` 为 用户 ID → 绑定 的映射；`intro` 预留，暂不使用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub name: String,

    #[serde(default)]
    pub outro: BTreeMap<String, OutroBinding>,

    #[serde(default)]
    pub intro: BTreeMap<String, OutroBinding>,
}

impl TrackRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outro: BTreeMap::new(),
            intro: BTreeMap::new(),
        }
    }
}

/// Track 聚合根 - 一个租户的音轨注册表
///
/// 不变量:
/// - 音轨名称在租户内唯一（映射键即名称）
/// - 一个用户在整个注册表中至多绑定一个 outro
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRegistry {
    pub version: u32,
    tracks: BTreeMap<String, TrackRecord>,
}

impl TrackRegistry {
    /// 空注册表（当前版本）
    pub fn new() -> Self {
        Self {
            version: REGISTRY_VERSION,
            tracks: BTreeMap::new(),
        }
    }

    /// 从记录集合构造（迁移与 global 种子路径）
    pub fn from_records(tracks: BTreeMap<String, TrackRecord>) -> Self {
        Self {
            version: REGISTRY_VERSION,
            tracks,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tracks.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TrackRecord> {
        self.tracks.get(name)
    }

    /// 登记一条新音轨；同名音轨已存在时报错
    pub fn insert(&mut self, record: TrackRecord) -> Result<(), TrackError> {
        if self.tracks.contains_key(&record.name) {
            return Err(TrackError::AlreadyExists(record.name));
        }
        self.tracks.insert(record.name.clone(), record);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<TrackRecord> {
        self.tracks.remove(name)
    }

    /// 绑定用户 outro
    ///
    /// 先将该用户从所有其他音轨的 outro 映射中移除，再写入目标音轨，
    /// 保证单归属不变量。重复绑定同一音轨是幂等的。
    pub fn set_outro(
        &mut self,
        track: &TrackName,
        user: &UserId,
        display_name: &str,
    ) -> Result<(), TrackError> {
        if !self.tracks.contains_key(track.as_str()) {
            return Err(TrackError::UnknownTrack(track.to_string()));
        }

        for record in self.tracks.values_mut() {
            record.outro.remove(user.as_str());
        }

        if let Some(record) = self.tracks.get_mut(track.as_str()) {
            record.outro.insert(
                user.as_str().to_string(),
                OutroBinding::new(user.clone(), display_name),
            );
        }

        Ok(())
    }

    /// 查找某用户当前绑定的 outro 音轨
    pub fn outro_track(&self, user: &UserId) -> Option<&TrackRecord> {
        self.tracks
            .values()
            .find(|record| record.outro.contains_key(user.as_str()))
    }

    pub fn records(&self) -> &BTreeMap<String, TrackRecord> {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }
}

impl Default for TrackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
