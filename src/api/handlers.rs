//! Request handlers: validate, call the provider, re-encode, respond

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    Json,
};

use crate::api::error::ApiError;
use crate::api::types::{
    ChatRequest, ChatResponse, SpeechRequest, SpeechResponse, TranscribeResponse,
};
use crate::audio::{encode_base64, extension_for, ScratchAudio};
use crate::config::{DEFAULT_VOICE, SPEECH_FORMAT};
use crate::provider::{ChatMessage, Provider, ProviderError};

const AUDIO_FIELD: &str = "audio";
const ASSISTANT_ROLE: &str = "assistant";

const NO_AUDIO: &str = "No audio file provided";
const NO_MESSAGE: &str = "No message provided";
const NO_TEXT: &str = "No text provided";

/// Shared by every request; never mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, request_timeout: Duration) -> Self {
        Self {
            provider,
            request_timeout,
        }
    }

    /// Run one provider call under the request timeout. On expiry the call's
    /// future is dropped, which aborts the outbound request.
    async fn call<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => Err(ApiError::internal(format!(
                "Provider request timed out after {:?}",
                self.request_timeout
            ))),
        }
    }
}

struct AudioUpload {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// POST /api/transcribe
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected transcription upload: {}", e);
        ApiError::bad_request(NO_AUDIO)
    })?;

    let upload = find_audio_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::bad_request(NO_AUDIO))?;

    // Dropping `scratch` removes the file, including on the error paths below
    let extension = extension_for(upload.file_name.as_deref(), upload.content_type.as_deref());
    let scratch = ScratchAudio::with_bytes(&extension, &upload.bytes).await?;

    let text = state.call(state.provider.transcribe(scratch.path())).await?;

    Ok(Json(TranscribeResponse { text }))
}

/// Find the first file part named `audio`. A plain text field with that
/// name does not count, matching what browsers send from `FormData` blobs.
async fn find_audio_field(multipart: &mut Multipart) -> Result<Option<AudioUpload>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AUDIO_FIELD) || field.file_name().is_none() {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(Some(AudioUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

fn multipart_error(err: MultipartError) -> ApiError {
    let message = err.body_text();
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Audio upload over the size limit: {}", message);
        ApiError::PayloadTooLarge(format!("Audio upload too large: {}", message))
    } else {
        tracing::debug!("Unreadable multipart body: {}", message);
        ApiError::bad_request(format!("Invalid multipart payload: {}", message))
    }
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_json)?;
    let message = request
        .message
        .ok_or_else(|| ApiError::bad_request(NO_MESSAGE))?;

    let messages = build_messages(request.history, message);
    let text = state.call(state.provider.chat(&messages)).await?;

    Ok(Json(ChatResponse {
        text,
        role: ASSISTANT_ROLE.to_string(),
    }))
}

/// Append the new user turn to whatever history the browser sent.
pub fn build_messages(history: Option<Vec<ChatMessage>>, message: String) -> Vec<ChatMessage> {
    let mut messages = history.unwrap_or_default();
    messages.push(ChatMessage::user(message));
    messages
}

/// POST /api/text-to-speech
pub async fn text_to_speech(
    State(state): State<AppState>,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Json<SpeechResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_json)?;
    let text = request.text.ok_or_else(|| ApiError::bad_request(NO_TEXT))?;
    let voice = request.voice.unwrap_or_else(|| DEFAULT_VOICE.to_string());

    match synthesize_audio(&state, &text, &voice).await {
        Ok(audio) => Ok(Json(SpeechResponse {
            audio: encode_base64(&audio),
            format: SPEECH_FORMAT.to_string(),
        })),
        Err(err) => {
            tracing::error!(error = ?err, voice = %voice, "Text-to-speech error: {}", err);
            Err(err)
        }
    }
}

async fn synthesize_audio(state: &AppState, text: &str, voice: &str) -> Result<Vec<u8>, ApiError> {
    let scratch = ScratchAudio::create(SPEECH_FORMAT)?;
    state
        .call(state.provider.synthesize(text, voice, scratch.path()))
        .await?;
    Ok(scratch.read().await?)
}

fn invalid_json(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(format!("Invalid JSON payload: {}", rejection.body_text()))
}
