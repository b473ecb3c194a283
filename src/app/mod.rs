use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::api::{ApiServer, AppState};
use crate::auth::{oauth::OauthSettings, AuthenticatedClient, TokenRefresher, ZoomOauth};
use crate::chunk::SplitterConfig;
use crate::config::Config;
use crate::global;
use crate::pipeline::{PipelineMachine, PipelineStatusHandle};
use crate::session::SessionStore;
use crate::transcribe::WhisperApiTranscriber;
use crate::transform::ChatTransform;
use crate::zoom::ZoomRecordings;

pub async fn run_service() -> Result<()> {
    info!("Starting Lectern service");

    let config = Config::load()?;

    let oauth = Arc::new(ZoomOauth::new(OauthSettings {
        client_id: config
            .zoom
            .resolved_client_id()
            .context("zoom.client_id not set; configure it or export ZOOM_CLIENT_ID")?,
        client_secret: config
            .zoom
            .resolved_client_secret()
            .context("zoom.client_secret not set; configure it or export ZOOM_CLIENT_SECRET")?,
        redirect_uri: config.zoom.redirect_uri.clone(),
        authorize_url: config.zoom.authorize_url.clone(),
        token_url: config.zoom.token_url.clone(),
    }));

    let refresher = TokenRefresher::new(oauth.clone());
    let recordings = Arc::new(ZoomRecordings::new(
        &config.zoom.api_base_url,
        AuthenticatedClient::new(refresher),
    ));

    let transcriber = Arc::new(WhisperApiTranscriber::new(&config.transcription));
    let proofreader = Arc::new(ChatTransform::proofreader(
        &config.transform,
        &config.prompts,
    ));
    let questions = Arc::new(ChatTransform::question_writer(
        &config.transform,
        &config.prompts,
    ));

    let splitter = SplitterConfig::new(config.chunking.max_chunk_size, config.chunking.overlap)
        .context("Invalid [chunking] configuration")?;

    let transcripts_dir = if config.server.dump_transcripts {
        global::transcripts_dir().ok()
    } else {
        None
    };

    let status = PipelineStatusHandle::default();
    let pipeline = Arc::new(PipelineMachine::new(
        recordings.clone(),
        transcriber,
        proofreader,
        splitter,
        status.clone(),
        transcripts_dir,
    ));

    let state = AppState {
        sessions: SessionStore::default(),
        oauth,
        recordings,
        pipeline,
        questions,
        status,
    };

    info!("Lectern is ready!");
    info!(
        "Authorize at http://127.0.0.1:{}/auth/login",
        config.server.port
    );

    ApiServer::new(config.server.port, state).start().await
}
