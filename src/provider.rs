//! Provider module: OpenAI Whisper, chat completions and speech synthesis

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::{CHAT_MAX_TOKENS, CHAT_MODEL, SPEECH_FORMAT, TTS_MODEL, WHISPER_MODEL};
use crate::settings::Settings;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestError(String),
    #[error("Error code: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Audio file error: {0}")]
    FileError(String),
    #[error("Chat completion returned no choices")]
    EmptyCompletion,
}

/// One turn of a conversation, passed to the provider as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// The upstream speech/chat service the handlers call.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Transcribe the audio file at `audio`.
    async fn transcribe(&self, audio: &Path) -> Result<String, ProviderError>;

    /// Return the assistant reply for `messages`.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;

    /// Synthesize `text` with `voice` and write the audio to `output`.
    async fn synthesize(&self, text: &str, voice: &str, output: &Path) -> Result<(), ProviderError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl OpenAiProvider {
    pub fn new(settings: &Settings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            api_base: settings.api_base.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Turn a non-2xx response into an `ApiError`, keeping the provider's
    /// own message when the body carries one.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(error_resp) => error_resp.error.message,
            Err(_) => format!("HTTP {}: {}", status, body),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Provider error: {}", message);
        } else {
            tracing::warn!(status = status.as_u16(), "Provider rejected request: {}", message);
        }

        Err(ProviderError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn transcribe(&self, audio: &Path) -> Result<String, ProviderError> {
        let audio_data = tokio::fs::read(audio)
            .await
            .map_err(|e| ProviderError::FileError(e.to_string()))?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        tracing::info!("Sending audio to Whisper ({} bytes)", audio_data.len());

        let form = Form::new()
            .part("file", Part::bytes(audio_data).file_name(file_name))
            .text("model", WHISPER_MODEL);

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        let body = Self::check_status(response)
            .await?
            .text()
            .await
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        let transcription: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::ParseError(format!("{}: {}", e, body)))?;

        tracing::info!("Whisper transcribed {} chars", transcription.text.len());
        Ok(transcription.text)
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let payload = ChatCompletionRequest {
            model: CHAT_MODEL,
            messages,
            max_tokens: CHAT_MAX_TOKENS,
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        let chat_resp: ChatCompletionResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let reply = chat_resp
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyCompletion)?
            .message
            .content
            .unwrap_or_default();

        tracing::info!(
            turns = messages.len(),
            "Chat completion returned {} chars",
            reply.len()
        );
        Ok(reply)
    }

    async fn synthesize(&self, text: &str, voice: &str, output: &Path) -> Result<(), ProviderError> {
        let payload = SpeechRequest {
            model: TTS_MODEL,
            voice,
            input: text,
            response_format: SPEECH_FORMAT,
        };

        let response = self
            .client
            .post(self.endpoint("audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::RequestError(e.to_string()))?;

        let mut response = Self::check_status(response).await?;

        let mut file = tokio::fs::File::create(output)
            .await
            .map_err(|e| ProviderError::FileError(e.to_string()))?;
        let mut written = 0usize;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProviderError::RequestError(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| ProviderError::FileError(e.to_string()))?;
            written += chunk.len();
        }
        file.flush()
            .await
            .map_err(|e| ProviderError::FileError(e.to_string()))?;

        tracing::info!(voice, "Speech synthesis wrote {} bytes", written);
        Ok(())
    }
}
