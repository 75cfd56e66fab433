//! Audio payloads for speech-to-text.
//!
//! Any OpenAI-compatible `/audio/transcriptions` endpoint takes the audio as
//! a multipart `file` part; [`AudioFile`] carries what that part needs.

use std::path::Path;

use tracing::debug;

/// An in-memory audio clip with the metadata the multipart upload needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioFile {
    /// Wrap raw bytes; the MIME type is guessed from the file extension.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for_audio(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Read an audio file from disk.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        debug!(path = %path.display(), bytes = bytes.len(), "loaded audio file");
        Ok(Self::new(file_name, bytes))
    }

    pub(crate) fn to_part(&self) -> reqwest::Result<reqwest::multipart::Part> {
        reqwest::multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type)
    }
}

/// Check if a file path looks like an audio file.
pub fn is_audio_file(path: &str) -> bool {
    mime_for_audio(path) != "application/octet-stream"
}

/// MIME type for a known audio extension, `application/octet-stream` otherwise.
pub fn mime_for_audio(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match ext {
        "ogg" | "oga" | "opus" => "audio/ogg",
        "mp3" | "mpga" | "mpeg" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
