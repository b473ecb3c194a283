//! Speech-to-text capability.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::TranscriptionConfig;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("could not read audio file: {0}")]
    Io(#[from] std::io::Error),
    #[error("transcription request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("transcription service error ({status}): {body}")]
    Remote { status: StatusCode, body: String },
    #[error("could not parse transcription response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Opaque speech-to-text engine: local audio file in, transcript out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &'static str;

    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Whisper-compatible transcription API (multipart file upload).
pub struct WhisperApiTranscriber {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    language: Option<String>,
}

impl WhisperApiTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        info!(
            "Initialized Whisper API transcriber ({}, endpoint {})",
            config.model, config.endpoint
        );
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.resolved_api_key(),
            model: config.model.clone(),
            language: config.language.clone(),
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    fn name(&self) -> &'static str {
        "Whisper API"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        info!("Transcribing audio file: {:?}", audio_path);

        let file_data = tokio::fs::read(audio_path).await?;
        let filename = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_string();

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(file_data)
                    .file_name(filename)
                    .mime_str(mime_for(audio_path))
                    .map_err(TranscriptionError::Transport)?,
            )
            .text("model", self.model.clone());

        if let Some(lang) = &self.language {
            form = form.text("language", lang.clone());
        }

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TranscriptionError::Remote { status, body });
        }

        let parsed: TranscriptionResponse = serde_json::from_str(&body)?;
        let text = parsed.text.trim().to_string();

        info!("Transcription complete: {} chars", text.len());
        debug!("Raw transcription: {}", text);
        Ok(text)
    }
}
