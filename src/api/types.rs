//! Request and response bodies

use serde::{Deserialize, Serialize};

use crate::provider::ChatMessage;

/// POST /api/chat
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// Prior turns, forwarded verbatim ahead of the new message
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
}

/// POST /api/text-to-speech
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscribeResponse {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub text: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechResponse {
    /// Base64 encoded audio
    pub audio: String,
    pub format: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}
