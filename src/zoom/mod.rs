//! Zoom REST API: recording metadata, recording lists, audio download.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::auth::{ApiError, ApiResponse, AuthenticatedClient, TokenStore};

/// Recording file types we care about. Zoom reports several (`MP4`,
/// `TIMELINE`, `TRANSCRIPT`, ...); only the audio-only `M4A` entries feed
/// the pipeline, everything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingFileType {
    #[serde(rename = "M4A")]
    M4a,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingFile {
    #[serde(default = "RecordingFileType::other")]
    pub file_type: RecordingFileType,
    #[serde(default)]
    pub download_url: String,
}

impl RecordingFileType {
    fn other() -> Self {
        Self::Other
    }
}

/// Cloud recording metadata for one meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub recording_files: Vec<RecordingFile>,
    #[serde(default)]
    pub recording_play_passcode: Option<String>,
}

impl Recording {
    /// First audio-only file, if the recording has one. Absence is a valid
    /// outcome, not an error.
    pub fn audio_file(&self) -> Option<&RecordingFile> {
        self.recording_files
            .iter()
            .find(|f| f.file_type == RecordingFileType::M4a)
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
}

/// One entry of the user's cloud-recording list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSummary {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MeetingList {
    #[serde(default)]
    meetings: Vec<MeetingSummary>,
}

/// Source of recording metadata and audio, behind a trait so the pipeline
/// can run against deterministic fakes.
#[async_trait]
pub trait RecordingSource: Send + Sync {
    async fn fetch_recording(
        &self,
        store: &TokenStore,
        recording_id: &str,
    ) -> Result<Recording, ApiError>;

    /// Download one recording file to a scoped temp file. The file is
    /// removed when the returned handle is dropped, whichever way the
    /// pipeline run ends.
    async fn download_audio(
        &self,
        store: &TokenStore,
        recording: &Recording,
        file: &RecordingFile,
    ) -> Result<NamedTempFile>;
}

/// Real Zoom client. All metadata calls go through [`AuthenticatedClient`]
/// and therefore inherit the single 401 → refresh → retry rule.
pub struct ZoomRecordings {
    http: reqwest::Client,
    api_base: String,
    auth: AuthenticatedClient,
}

impl ZoomRecordings {
    pub fn new(api_base: &str, auth: AuthenticatedClient) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            auth,
        }
    }

    async fn get_json(&self, store: &TokenStore, url: String) -> Result<String, ApiError> {
        let response = self
            .auth
            .call(store, |token| {
                let http = self.http.clone();
                let url = url.clone();
                async move {
                    let response = http
                        .get(&url)
                        .bearer_auth(&token)
                        .send()
                        .await
                        .map_err(ApiError::Transport)?;
                    let status = response.status();
                    let body = response.text().await.map_err(ApiError::Transport)?;
                    Ok(ApiResponse::new(status, body))
                }
            })
            .await?;
        Ok(response.body)
    }

    /// The user's cloud recordings from `from` (default 2023-01-01) up to
    /// today.
    pub async fn list_recordings(
        &self,
        store: &TokenStore,
        from: Option<&str>,
    ) -> Result<Vec<MeetingSummary>, ApiError> {
        let me = self
            .get_json(store, format!("{}/users/me", self.api_base))
            .await?;
        let user: UserInfo = serde_json::from_str(&me)?;

        let from = from.unwrap_or("2023-01-01");
        let to = Utc::now().format("%Y-%m-%d").to_string();
        debug!("Listing recordings for user {} ({from}..{to})", user.id);

        let body = self
            .get_json(
                store,
                format!(
                    "{}/users/{}/recordings?from={}&to={}",
                    self.api_base, user.id, from, to
                ),
            )
            .await?;
        let list: MeetingList = serde_json::from_str(&body)?;
        Ok(list.meetings)
    }
}

#[async_trait]
impl RecordingSource for ZoomRecordings {
    async fn fetch_recording(
        &self,
        store: &TokenStore,
        recording_id: &str,
    ) -> Result<Recording, ApiError> {
        info!("Fetching recording metadata for {}", recording_id);
        let body = self
            .get_json(
                store,
                format!("{}/meetings/{}/recordings", self.api_base, recording_id),
            )
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn download_audio(
        &self,
        store: &TokenStore,
        recording: &Recording,
        file: &RecordingFile,
    ) -> Result<NamedTempFile> {
        let access_token = store
            .get()
            .await
            .map(|t| t.access_token)
            .context("No session token for download")?;

        // The download host authenticates via query parameters, not the
        // Authorization header.
        let mut params = vec![("access_token", access_token)];
        if let Some(passcode) = &recording.recording_play_passcode {
            params.push(("playback_access_token", passcode.clone()));
        }

        info!("Downloading audio for recording {}", recording.uuid);

        let mut response = self
            .http
            .get(&file.download_url)
            .query(&params)
            .send()
            .await
            .context("Audio download request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Audio download failed with status {}", status);
        }

        let mut audio = tempfile::Builder::new()
            .prefix("lectern-audio-")
            .suffix(".m4a")
            .tempfile()
            .context("Failed to create temp file for audio")?;

        let mut bytes = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Audio download interrupted")?
        {
            audio
                .as_file_mut()
                .write_all(&chunk)
                .context("Failed to write audio to temp file")?;
            bytes += chunk.len();
        }

        info!("Downloaded {} bytes to {:?}", bytes, audio.path());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_parses_zoom_payload() {
        let json = r#"{
            "uuid": "abc==",
            "topic": "Weekly lecture",
            "recording_play_passcode": "pass123",
            "recording_files": [
                {"file_type": "MP4", "download_url": "https://zoom.us/rec/v"},
                {"file_type": "M4A", "download_url": "https://zoom.us/rec/a"},
                {"file_type": "TIMELINE", "download_url": ""}
            ]
        }"#;
        let recording: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(recording.recording_files.len(), 3);

        let audio = recording.audio_file().unwrap();
        assert_eq!(audio.download_url, "https://zoom.us/rec/a");
    }

    #[test]
    fn test_unknown_file_types_map_to_other() {
        let file: RecordingFile = serde_json::from_str(
            r#"{"file_type": "CHAT", "download_url": "https://zoom.us/rec/c"}"#,
        )
        .unwrap();
        assert_eq!(file.file_type, RecordingFileType::Other);
    }

    #[test]
    fn test_recording_without_audio_has_no_file() {
        let recording: Recording = serde_json::from_str(
            r#"{"uuid": "x", "recording_files": [{"file_type": "MP4", "download_url": "u"}]}"#,
        )
        .unwrap();
        assert!(recording.audio_file().is_none());
    }

    #[test]
    fn test_meeting_list_parses_partial_entries() {
        let list: MeetingList = serde_json::from_str(
            r#"{"meetings": [{"id": 123, "topic": "Lecture"}, {"uuid": "y=="}]}"#,
        )
        .unwrap();
        assert_eq!(list.meetings.len(), 2);
        assert_eq!(list.meetings[0].id, Some(123));
        assert_eq!(list.meetings[1].uuid.as_deref(), Some("y=="));
    }
}
