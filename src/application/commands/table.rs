//! 静态命令表
//!
//! 命令定义从 TOML 文件加载；每个条目的 `function` 字段在启动时
//! 对照封闭的 [`CommandId`] 枚举校验，未知引用立即失败，
//! 而不是等到派发时。

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// 路由/命令表错误
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Commands file not readable: {0}")]
    TableUnreadable(String),

    #[error("Commands file not parseable: {0}")]
    TableUnparseable(String),

    #[error("Unknown handler function '{function}' for command '{command}'")]
    UnknownFunction { command: String, function: String },
}

/// 处理器标识（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Sound,
    Add,
    Remove,
    List,
    SetOutro,
    Outro,
    SetPrefix,
    Help,
}

impl CommandId {
    /// 从命令表的 function 字段解析
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sound" => Some(Self::Sound),
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            "list" => Some(Self::List),
            "setoutro" => Some(Self::SetOutro),
            "outro" => Some(Self::Outro),
            "setprefix" => Some(Self::SetPrefix),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// 单条命令定义（TOML 形状）
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    #[serde(default)]
    pub desc: String,

    #[serde(default)]
    pub usage: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    /// 最少参数个数
    #[serde(default)]
    pub argmin: usize,

    /// 权限标签；只识别 "admin"，其余视为无限制
    #[serde(default = "default_permission")]
    pub permission: String,

    #[serde(default)]
    pub disabled: bool,

    /// 处理器名称，缺省为命令名本身
    #[serde(default)]
    pub function: Option<String>,
}

fn default_permission() -> String {
    "any".to_string()
}

/// 已校验的命令条目
#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub id: CommandId,
    pub spec: CommandSpec,
}

/// 命令表
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: BTreeMap<String, CommandEntry>,
}

impl CommandTable {
    /// 从 TOML 文件加载并校验
    pub async fn load(path: &Path) -> Result<Self, RouterError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| RouterError::TableUnreadable(format!("{:?}: {}", path, e)))?;

        let specs: BTreeMap<String, CommandSpec> =
            toml::from_str(&text).map_err(|e| RouterError::TableUnparseable(e.to_string()))?;

        Self::from_specs(specs)
    }

    /// 校验所有 function 引用并建表
    pub fn from_specs(specs: BTreeMap<String, CommandSpec>) -> Result<Self, RouterError> {
        let mut entries = BTreeMap::new();

        for (command, spec) in specs {
            let function = spec.function.clone().unwrap_or_else(|| command.clone());
            let id = CommandId::from_name(&function).ok_or_else(|| RouterError::UnknownFunction {
                command: command.clone(),
                function,
            })?;

            entries.insert(command, CommandEntry { id, spec });
        }

        Ok(Self { entries })
    }

    /// 解析命令 token：直接命中或经别名折返到规范名
    pub fn resolve(&self, token: &str) -> Option<(&str, &CommandEntry)> {
        if let Some((name, entry)) = self.entries.get_key_value(token) {
            return Some((name.as_str(), entry));
        }

        self.entries
            .iter()
            .find(|(_, entry)| entry.spec.aliases.iter().any(|a| a == token))
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// 按名称顺序遍历（help 输出用）
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CommandEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(function: Option<&str>) -> CommandSpec {
        CommandSpec {
            desc: String::new(),
            usage: String::new(),
            aliases: vec![],
            argmin: 0,
            permission: "any".to_string(),
            disabled: false,
            function: function.map(str::to_string),
        }
    }

    #[test]
    fn test_function_defaults_to_command_name() {
        let mut specs = BTreeMap::new();
        specs.insert("sound".to_string(), spec(None));

        let table = CommandTable::from_specs(specs).unwrap();
        assert_eq!(table.resolve("sound").unwrap().1.id, CommandId::Sound);
    }

    #[test]
    fn test_unknown_function_fails_fast() {
        let mut specs = BTreeMap::new();
        specs.insert("sound".to_string(), spec(Some("does_not_exist")));

        let err = CommandTable::from_specs(specs).unwrap_err();
        assert!(matches!(err, RouterError::UnknownFunction { .. }));
    }

    #[test]
    fn test_alias_resolution() {
        let mut s = spec(Some("sound"));
        s.aliases = vec!["s".to_string(), "play".to_string()];
        let mut specs = BTreeMap::new();
        specs.insert("sound".to_string(), s);

        let table = CommandTable::from_specs(specs).unwrap();
        let (name, entry) = table.resolve("play").unwrap();
        assert_eq!(name, "sound");
        assert_eq!(entry.id, CommandId::Sound);
        assert!(table.resolve("nope").is_none());
    }

    #[test]
    fn test_toml_table_parses() {
        let text = r#"
            [sound]
            desc = "Play a sound"
            usage = "[name]"
            argmin = 1
            aliases = ["s"]

            [setprefix]
            desc = "Set the prefix"
            permission = "admin"
            argmin = 1
        "#;
        let specs: BTreeMap<String, CommandSpec> = toml::from_str(text).unwrap();
        let table = CommandTable::from_specs(specs).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("s").unwrap().0, "sound");
        assert_eq!(
            table.resolve("setprefix").unwrap().1.spec.permission,
            "admin"
        );
    }
}
