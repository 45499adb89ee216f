//! Manifest - 已知集合的持久化清单

use serde::{Deserialize, Serialize};

/// 清单文件名
pub const MANIFEST_FILE: &str = "manifest.json";

/// 集合清单
///
/// 不变量: `count == list.len()`，`list` 无重复项。
/// 每次装载对账后重写，只保留实际装载成功的名称。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub count: usize,
    pub list: Vec<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            count: 0,
            list: Vec::new(),
        }
    }

    pub fn from_names(list: Vec<String>) -> Self {
        Self {
            count: list.len(),
            list,
        }
    }

    /// 登记名称；已存在时无操作
    pub fn push(&mut self, name: &str) {
        if !self.contains(name) {
            self.list.push(name.to_string());
            self.count += 1;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.list.iter().any(|n| n == name)
    }

    /// 形状不变量检查（装载路径）
    pub fn validate(&self) -> Result<(), String> {
        if self.count != self.list.len() {
            return Err(format!(
                "manifest count {} does not match list length {}",
                self.count,
                self.list.len()
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for name in &self.list {
            if !seen.insert(name) {
                return Err(format!("duplicate collection name: {}", name));
            }
        }

        Ok(())
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}
