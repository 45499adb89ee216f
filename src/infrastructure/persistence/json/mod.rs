//! JSON 文件集合存储
//!
//! 一个清单文件（manifest.json）加每集合一个 `<name>.dat` 文件，
//! 全部 JSON 编码，放在单一配置目录下。

mod manifest;
mod store;

pub use manifest::{Manifest, MANIFEST_FILE};
pub use store::JsonCollectionStore;
