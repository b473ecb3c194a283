//! Pipeline orchestrator.
//!
//! Runs one recording end to end:
//! fetch metadata → download → transcribe → chunk → transform → store.
//!
//! All capabilities are injected via constructor — no concrete types
//! hardcoded. No stage is retried here; the only retry in the system is the
//! single 401 refresh inside the authenticated client.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::auth::ApiError;
use crate::chunk::{process, split, ProcessingError, SplitterConfig};
use crate::session::SessionHandle;
use crate::transcribe::{Transcriber, TranscriptionError};
use crate::transform::TextTransform;
use crate::zoom::RecordingSource;

use super::status::{PipelinePhase, PipelineStatusHandle};

/// Terminal failure of one pipeline run, tagged with the stage it died in.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("authentication required: {0}")]
    Auth(ApiError),
    #[error("failed to retrieve recording: {0}")]
    Recording(ApiError),
    #[error("audio download failed: {0}")]
    Download(String),
    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),
    #[error("transcript processing failed: {0}")]
    Processing(#[from] ProcessingError),
}

impl From<ApiError> for PipelineError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthenticated | ApiError::AuthFailed(_) => Self::Auth(err),
            _ => Self::Recording(err),
        }
    }
}

pub struct PipelineMachine {
    source: Arc<dyn RecordingSource>,
    transcriber: Arc<dyn Transcriber>,
    proofreader: Arc<dyn TextTransform>,
    splitter: SplitterConfig,
    status: PipelineStatusHandle,
    transcripts_dir: Option<PathBuf>,
    // One in-flight run at a time.
    run_gate: Mutex<()>,
}

impl PipelineMachine {
    pub fn new(
        source: Arc<dyn RecordingSource>,
        transcriber: Arc<dyn Transcriber>,
        proofreader: Arc<dyn TextTransform>,
        splitter: SplitterConfig,
        status: PipelineStatusHandle,
        transcripts_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            source,
            transcriber,
            proofreader,
            splitter,
            status,
            transcripts_dir,
            run_gate: Mutex::new(()),
        }
    }

    /// Run the full pipeline for one recording, storing the processed
    /// transcript in the session and returning it.
    ///
    /// A recording without an audio file completes with an empty result —
    /// absence of audio is a valid terminal outcome, not an error.
    pub async fn run(
        &self,
        session: &SessionHandle,
        recording_id: &str,
    ) -> Result<String, PipelineError> {
        let _guard = self.run_gate.lock().await;

        if session.tokens().get().await.is_none() {
            self.status
                .set_error("authentication required".to_string())
                .await;
            return Err(PipelineError::Auth(ApiError::Unauthenticated));
        }

        self.status.begin(recording_id).await;
        match self.run_stages(session, recording_id).await {
            Ok(result) => {
                self.status.complete().await;
                Ok(result)
            }
            Err(err) => {
                error!("Pipeline run for {} failed: {}", recording_id, err);
                self.status.set_error(err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        session: &SessionHandle,
        recording_id: &str,
    ) -> Result<String, PipelineError> {
        let recording = self
            .source
            .fetch_recording(session.tokens(), recording_id)
            .await?;

        let Some(file) = recording.audio_file().cloned() else {
            info!("Recording {} has no audio file, nothing to do", recording_id);
            session.set_processed(String::new()).await;
            return Ok(String::new());
        };

        self.status.set_phase(PipelinePhase::Downloading).await;
        // The temp file is dropped (and removed) when this function
        // returns, success or failure.
        let audio = self
            .source
            .download_audio(session.tokens(), &recording, &file)
            .await
            .map_err(|e| PipelineError::Download(e.to_string()))?;

        self.status.set_phase(PipelinePhase::Transcribing).await;
        let transcript = self.transcriber.transcribe(audio.path()).await?;
        self.dump_transcript(recording_id, &transcript);
        session.set_transcript(transcript.clone()).await;

        self.status.set_phase(PipelinePhase::Chunking).await;
        let chunks = split(&transcript, &self.splitter);
        self.status.set_chunk_count(chunks.len()).await;
        info!(
            "Transcript of {} chars split into {} chunks",
            transcript.len(),
            chunks.len()
        );

        self.status.set_phase(PipelinePhase::Processing).await;
        let processed = process(&chunks, self.proofreader.as_ref()).await?;

        session.set_processed(processed.clone()).await;
        info!(
            "Pipeline for {} complete: {} chars processed",
            recording_id,
            processed.len()
        );
        Ok(processed)
    }

    /// Plain-text dump of the raw transcript. Informational only; failure
    /// to write it never fails the run.
    fn dump_transcript(&self, recording_id: &str, transcript: &str) {
        let Some(dir) = &self.transcripts_dir else {
            return;
        };
        let safe_id: String = recording_id
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let path = dir.join(format!("{safe_id}.txt"));
        if let Err(e) =
            std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, transcript))
        {
            warn!("Failed to dump transcript to {:?}: {}", path, e);
        }
    }
}
