//! Guild Settings - 租户设置记录
//!
//! 每个租户一条记录，首次收到该租户消息时创建。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 租户设置所在的固定集合名
pub const GUILD_COLLECTION: &str = "guild";

/// 租户设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSettings {
    /// 命令前缀（单字符）
    pub prefix: char,

    /// 首次观察到该租户的时间
    #[serde(default = "Utc::now")]
    pub first_seen: DateTime<Utc>,
}

impl GuildSettings {
    pub fn new(prefix: char) -> Self {
        Self {
            prefix,
            first_seen: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_roundtrip() {
        let settings = GuildSettings::new('!');
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["prefix"], "!");

        let back: GuildSettings = serde_json::from_value(value).unwrap();
        assert_eq!(back.prefix, '!');
    }

    #[test]
    fn test_legacy_record_without_timestamp() {
        // 旧记录只有 prefix 字段
        let back: GuildSettings = serde_json::from_value(serde_json::json!({"prefix": "$"})).unwrap();
        assert_eq!(back.prefix, '$');
    }
}
