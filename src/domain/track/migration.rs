//! Track Context - 存储形状迁移
//!
//! 历史数据里存在两代旧形状:
//! - `{"bits": ["name", ...]}` - 名称列表
//! - `{"bits": {"name": {record}}}` - 记录映射
//!
//! 启动时一次性升级到带版本号的当前形状
//! `{"version": 2, "tracks": {...}}`，此后读取路径不再做形状检查。

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{TrackRecord, TrackRegistry, REGISTRY_VERSION};

/// 迁移结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// 已是当前形状，未改动
    Current,
    /// 旧形状，已升级
    Upgraded,
    /// 无法辨认的形状，重置为空注册表
    Reset,
}

/// 升级单个注册表集合
///
/// 返回 `(结果, 新集合)`；`Current` 时新集合为 None，调用方无须回写。
/// 空集合 `{}` 视为"未播种"，保持原样交给种子逻辑处理。
pub fn migrate_registry(raw: &Map<String, Value>) -> (MigrationOutcome, Option<Map<String, Value>>) {
    // 未播种的新集合
    if raw.is_empty() {
        return (MigrationOutcome::Current, None);
    }

    // 已是当前形状
    if raw.get("version").and_then(Value::as_u64) == Some(REGISTRY_VERSION as u64)
        && raw.get("tracks").map(Value::is_object).unwrap_or(false)
    {
        return (MigrationOutcome::Current, None);
    }

    match raw.get("bits") {
        // 第一代: 名称列表
        Some(Value::Array(names)) => {
            let tracks: BTreeMap<String, TrackRecord> = names
                .iter()
                .filter_map(Value::as_str)
                .map(|name| (name.to_string(), TrackRecord::new(name)))
                .collect();
            (
                MigrationOutcome::Upgraded,
                Some(to_map(TrackRegistry::from_records(tracks))),
            )
        }

        // 第二代: 记录映射；解析失败的条目退化为空记录
        Some(Value::Object(entries)) => {
            let tracks: BTreeMap<String, TrackRecord> = entries
                .iter()
                .map(|(name, value)| {
                    let record = serde_json::from_value::<TrackRecord>(value.clone())
                        .unwrap_or_else(|_| TrackRecord::new(name.clone()));
                    (name.clone(), record)
                })
                .collect();
            (
                MigrationOutcome::Upgraded,
                Some(to_map(TrackRegistry::from_records(tracks))),
            )
        }

        // 形状无法辨认
        _ => (
            MigrationOutcome::Reset,
            Some(to_map(TrackRegistry::new())),
        ),
    }
}

fn to_map(registry: TrackRegistry) -> Map<String, Value> {
    match serde_json::to_value(registry) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_empty_collection_untouched() {
        let (outcome, replacement) = migrate_registry(&Map::new());
        assert_eq!(outcome, MigrationOutcome::Current);
        assert!(replacement.is_none());
    }

    #[test]
    fn test_current_shape_untouched() {
        let raw = as_map(json!({"version": 2, "tracks": {}}));
        let (outcome, replacement) = migrate_registry(&raw);
        assert_eq!(outcome, MigrationOutcome::Current);
        assert!(replacement.is_none());
    }

    #[test]
    fn test_list_shape_upgrades() {
        let raw = as_map(json!({"bits": ["horn", "trombone"]}));
        let (outcome, replacement) = migrate_registry(&raw);
        assert_eq!(outcome, MigrationOutcome::Upgraded);

        let upgraded = replacement.unwrap();
        assert_eq!(upgraded["version"], 2);
        assert_eq!(upgraded["tracks"]["horn"]["name"], "horn");
        assert!(upgraded["tracks"]["trombone"]["outro"]
            .as_object()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_map_shape_upgrades_and_keeps_outros() {
        let raw = as_map(json!({
            "bits": {
                "horn": {
                    "name": "horn",
                    "outro": {"42": {"display_name": "nate", "id": "42"}},
                    "intro": {}
                }
            }
        }));
        let (outcome, replacement) = migrate_registry(&raw);
        assert_eq!(outcome, MigrationOutcome::Upgraded);

        let upgraded = replacement.unwrap();
        assert_eq!(upgraded["tracks"]["horn"]["outro"]["42"]["id"], "42");
    }

    #[test]
    fn test_unrecognized_shape_resets() {
        let raw = as_map(json!({"bits": 7}));
        let (outcome, replacement) = migrate_registry(&raw);
        assert_eq!(outcome, MigrationOutcome::Reset);

        let reset = replacement.unwrap();
        assert_eq!(reset["version"], 2);
        assert!(reset["tracks"].as_object().unwrap().is_empty());
    }
}
