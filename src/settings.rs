//! Runtime settings loaded from the environment

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::config::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS, OPENAI_API_BASE};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub api_base: String,
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Everything except the API key
    /// falls back to a default when absent or unusable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|raw| raw.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(SettingsError::MissingApiKey)?;

        let api_base = lookup("OPENAI_BASE_URL")
            .map(|raw| raw.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| OPENAI_API_BASE.to_string());

        let host = match lookup("HOST") {
            Some(raw) if raw.trim().is_empty() => {
                warn!("Empty HOST, falling back to {}", DEFAULT_HOST);
                DEFAULT_HOST.to_string()
            }
            Some(raw) => raw.trim().to_string(),
            None => DEFAULT_HOST.to_string(),
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                warn!("Invalid PORT='{}', falling back to {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(
                        "Invalid REQUEST_TIMEOUT_SECS='{}', falling back to {}",
                        raw, DEFAULT_REQUEST_TIMEOUT_SECS
                    );
                    DEFAULT_REQUEST_TIMEOUT_SECS
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            api_base,
            host,
            port,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
