//! Configuration module for the relay
//! Note: the API key is never hardcoded; it comes from `OPENAI_API_KEY`.

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Provider models
pub const WHISPER_MODEL: &str = "whisper-1";
pub const CHAT_MODEL: &str = "gpt-4o";
pub const CHAT_MAX_TOKENS: u32 = 150;
pub const TTS_MODEL: &str = "tts-1";

/// Speech synthesis
pub const DEFAULT_VOICE: &str = "nova";
pub const SPEECH_FORMAT: &str = "mp3";

/// Server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Whisper rejects uploads above 25 MB
pub const AUDIO_UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;
