//! Pipeline phase tracking, readable by API handlers.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Phase of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Idle,
    FetchingRecording,
    Downloading,
    Transcribing,
    Chunking,
    Processing,
    Completed,
    Error,
}

impl PipelinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingRecording => "fetching_recording",
            Self::Downloading => "downloading",
            Self::Transcribing => "transcribing",
            Self::Chunking => "chunking",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Current pipeline state.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub phase: PipelinePhase,
    pub recording_id: Option<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub chunk_count: Option<usize>,
    pub last_error: Option<String>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            phase: PipelinePhase::Idle,
            recording_id: None,
            started_at: None,
            chunk_count: None,
            last_error: None,
        }
    }
}

/// Thread-safe handle shared between the machine and the API handlers.
#[derive(Clone, Default)]
pub struct PipelineStatusHandle {
    inner: Arc<Mutex<PipelineState>>,
}

impl PipelineStatusHandle {
    pub async fn get(&self) -> PipelineState {
        self.inner.lock().await.clone()
    }

    pub async fn begin(&self, recording_id: &str) {
        let mut state = self.inner.lock().await;
        state.phase = PipelinePhase::FetchingRecording;
        state.recording_id = Some(recording_id.to_string());
        state.started_at = Some(chrono::Utc::now());
        state.chunk_count = None;
        state.last_error = None;
    }

    pub async fn set_phase(&self, phase: PipelinePhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
    }

    pub async fn set_chunk_count(&self, count: usize) {
        let mut state = self.inner.lock().await;
        state.chunk_count = Some(count);
    }

    pub async fn set_error(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.phase = PipelinePhase::Error;
        state.last_error = Some(error);
    }

    pub async fn complete(&self) {
        let mut state = self.inner.lock().await;
        state.phase = PipelinePhase::Completed;
    }
}
