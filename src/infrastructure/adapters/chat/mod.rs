//! Chat Adapters - 聊天连接器实现

mod memory;

pub use memory::{InMemoryChatConnector, OutboundMessage};
