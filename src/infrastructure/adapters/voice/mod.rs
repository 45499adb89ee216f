//! Voice Adapters - 语音传输实现

mod memory;

pub use memory::InMemoryVoiceTransport;
