//! Speech-to-text via OpenAI-compatible `/audio/transcriptions` endpoints

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::Provider;

/// Default transcription model on Groq
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-large-v3-turbo";

/// Turns recorded audio into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an encoded audio file (wav, mp3, m4a, ...).
    ///
    /// `file_name` is forwarded so the service can sniff the container format.
    async fn transcribe(&self, audio: &[u8], file_name: &str) -> Result<String>;
}

/// Whisper served behind an OpenAI-compatible API
pub struct WhisperTranscriber {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperTranscriber {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }

    /// Whisper on the given provider's default endpoint
    pub fn for_provider(provider: Provider, api_key: Option<String>) -> Self {
        Self::new(provider.default_base_url(), api_key, DEFAULT_TRANSCRIPTION_MODEL)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &[u8], file_name: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(Error::Transcription("audio file is empty".into()));
        }

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))
            .map_err(|e| Error::Transcription(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", part);

        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        tracing::debug!(url = %url, bytes = audio.len(), model = %self.model, "transcribing audio");

        let mut req = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, body));
        }

        let parsed: TranscriptionResponse = response.json().await?;
        Ok(parsed.text.trim().to_string())
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" | "mpga" | "mpeg" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}
