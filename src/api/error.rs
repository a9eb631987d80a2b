//! Error type shared by every handler, mapped to HTTP in one place

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::types::ErrorResponse;
use crate::audio::AudioError;
use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or unusable input from the browser
    #[error("{0}")]
    BadRequest(String),
    /// Upload over the route's body limit
    #[error("{0}")]
    PayloadTooLarge(String),
    /// Provider or local I/O failure
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<AudioError> for ApiError {
    fn from(err: AudioError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
