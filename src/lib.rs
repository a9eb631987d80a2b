//! VoxRelay - browser relay for OpenAI speech-to-text, chat and text-to-speech

pub mod api;
pub mod audio;
pub mod config;
pub mod provider;
pub mod settings;

pub use api::{create_router, AppState};
pub use provider::{ChatMessage, OpenAiProvider, Provider, ProviderError};
pub use settings::{Settings, SettingsError};
