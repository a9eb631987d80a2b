//! Scoped temporary audio files and base64 encoding for the browser

use std::path::Path;

use base64::Engine;
use tempfile::TempPath;
use thiserror::Error;

const SCRATCH_PREFIX: &str = "voxrelay-";
const FALLBACK_EXTENSION: &str = "wav";

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to create temporary audio file: {0}")]
    CreateError(std::io::Error),
    #[error("Failed to write audio file: {0}")]
    WriteError(std::io::Error),
    #[error("Failed to read audio file: {0}")]
    ReadError(std::io::Error),
}

/// A uniquely named audio file in the OS temp directory.
///
/// The file is removed when this value is dropped, whichever way the
/// owning request finishes.
#[derive(Debug)]
pub struct ScratchAudio {
    path: TempPath,
}

impl ScratchAudio {
    /// Create an empty file with the given extension (without the dot).
    pub fn create(extension: &str) -> Result<Self, AudioError> {
        let suffix = format!(".{}", extension);
        let file = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(&suffix)
            .tempfile()
            .map_err(AudioError::CreateError)?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// Create a file already holding `bytes`.
    pub async fn with_bytes(extension: &str, bytes: &[u8]) -> Result<Self, AudioError> {
        let scratch = Self::create(extension)?;
        tokio::fs::write(scratch.path(), bytes)
            .await
            .map_err(AudioError::WriteError)?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<Vec<u8>, AudioError> {
        tokio::fs::read(self.path())
            .await
            .map_err(AudioError::ReadError)
    }
}

/// Pick the file extension for an upload. The name the browser sent wins;
/// recordings usually arrive as a bare `blob`, so the part's content type
/// is tried next, then `wav`.
pub fn extension_for(file_name: Option<&str>, content_type: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .or_else(|| content_type.and_then(extension_for_mime).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match essence.as_str() {
        "audio/webm" | "video/webm" => "webm",
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "video/mp4" => "mp4",
        "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/wave" | "audio/x-wav" => "wav",
        "audio/flac" | "audio/x-flac" => "flac",
        _ => return None,
    };
    Some(ext)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scratch_file_holds_bytes_until_dropped() {
        let scratch = ScratchAudio::with_bytes("wav", b"RIFF0000WAVE")
            .await
            .expect("scratch file should be created");
        let path = scratch.path().to_path_buf();

        assert!(path.exists());
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(SCRATCH_PREFIX) && n.ends_with(".wav")));
        assert_eq!(scratch.read().await.unwrap(), b"RIFF0000WAVE");

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn scratch_files_get_unique_names() {
        let a = ScratchAudio::create("mp3").unwrap();
        let b = ScratchAudio::create("mp3").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn read_after_external_delete_is_an_error() {
        let scratch = ScratchAudio::create("mp3").unwrap();
        std::fs::remove_file(scratch.path()).unwrap();

        let result = scratch.read().await;
        assert!(matches!(result, Err(AudioError::ReadError(_))));
    }

    #[test]
    fn extension_follows_upload_name() {
        assert_eq!(extension_for(Some("recording.webm"), None), "webm");
        assert_eq!(extension_for(Some("Voice.MP3"), Some("audio/webm")), "mp3");
    }

    #[test]
    fn extension_from_content_type_for_bare_blob() {
        assert_eq!(extension_for(Some("blob"), Some("audio/webm;codecs=opus")), "webm");
        assert_eq!(extension_for(Some("blob"), Some("audio/ogg")), "ogg");
        assert_eq!(extension_for(Some("blob"), Some("Audio/MPEG")), "mp3");
        assert_eq!(extension_for(None, Some("audio/x-m4a")), "m4a");
    }

    #[test]
    fn extension_falls_back_to_wav() {
        assert_eq!(extension_for(None, None), "wav");
        assert_eq!(extension_for(Some("blob"), None), "wav");
        assert_eq!(extension_for(Some("blob"), Some("application/octet-stream")), "wav");
        assert_eq!(extension_for(Some("clip."), None), "wav");
        assert_eq!(extension_for(Some("clip.we/bm"), None), "wav");
        assert_eq!(extension_for(Some("clip.toolongext"), None), "wav");
    }

    #[test]
    fn base64_uses_padded_standard_alphabet() {
        assert_eq!(encode_base64(b""), "");
        assert_eq!(encode_base64(b"ID3"), "SUQz");
        assert_eq!(encode_base64(&[0xff, 0xfb]), "//s=");
    }
}
