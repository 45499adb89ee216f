//! Adapters - 端口适配器

pub mod chat;
pub mod storage;
pub mod voice;

pub use chat::InMemoryChatConnector;
pub use storage::FileAudioLibrary;
pub use voice::InMemoryVoiceTransport;
