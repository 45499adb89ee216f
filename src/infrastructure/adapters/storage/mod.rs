//! Storage Adapters - 文件存储

mod audio_library;

pub use audio_library::FileAudioLibrary;
