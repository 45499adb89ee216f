//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_library;
mod chat_connector;
mod collection_store;
mod voice_transport;

pub use audio_library::{AudioLibraryPort, LibraryError};
pub use chat_connector::{Attachment, ChatConnectorPort, ChatError, ChatMessage};
pub use collection_store::{Collection, CollectionStorePort, StoreError};
pub use voice_transport::{
    ParticipantState, VoiceChannelSnapshot, VoiceError, VoicePresence, VoiceSessionPort,
    VoiceTransportPort,
};
