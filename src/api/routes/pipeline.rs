//! Pipeline and question-generation endpoints.
//!
//! - POST /transcript/:recording_id - run the full pipeline for a recording
//! - GET  /transcript               - the session's processed transcript
//! - GET  /pipeline/status          - current pipeline phase
//! - POST /questions                - generate study questions
//! - GET  /questions                - the session's last generated questions

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{resolve_session, with_session_cookie};
use crate::api::error::ApiError;
use crate::api::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QuestionsRequest {
    /// Transcript to generate questions from. Falls back to the session's
    /// processed transcript when omitted.
    pub transcript: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/transcript/:recording_id", post(run_pipeline))
        .route("/transcript", get(get_transcript))
        .route("/pipeline/status", get(pipeline_status))
        .route("/questions", post(generate_questions).get(get_questions))
        .with_state(state)
}

async fn run_pipeline(
    State(state): State<AppState>,
    Path(recording_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (sid, session) = resolve_session(&state.sessions, &headers).await;

    info!(
        "Pipeline run requested for recording {} (session {})",
        recording_id, sid.id
    );

    let response = match state.pipeline.run(&session, &recording_id).await {
        Ok(processed) => Json(json!({
            "success": true,
            "recording_id": recording_id,
            "processed_transcript": processed,
        }))
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    };
    with_session_cookie(&sid, response)
}

async fn get_transcript(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (sid, session) = resolve_session(&state.sessions, &headers).await;

    let response = match session.processed().await {
        Some(processed) => Json(json!({ "processed_transcript": processed })).into_response(),
        None => ApiError::not_found("No processed transcript for this session").into_response(),
    };
    with_session_cookie(&sid, response)
}

async fn pipeline_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.status.get().await;
    Json(json!({
        "phase": status.phase.as_str(),
        "recording_id": status.recording_id,
        "started_at": status.started_at.map(|t| t.to_rfc3339()),
        "chunk_count": status.chunk_count,
        "last_error": status.last_error,
    }))
}

async fn generate_questions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<QuestionsRequest>>,
) -> Response {
    let (sid, session) = resolve_session(&state.sessions, &headers).await;

    let transcript = match body.and_then(|Json(req)| req.transcript) {
        Some(t) => Some(t),
        None => session.processed().await,
    };
    let Some(transcript) = transcript.filter(|t| !t.is_empty()) else {
        return with_session_cookie(
            &sid,
            ApiError::bad_request("No transcript to generate questions from").into_response(),
        );
    };

    let response = match state.questions.transform(&transcript).await {
        Ok(questions) => {
            session.set_questions(questions.clone()).await;
            Json(json!({ "questions": questions })).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    };
    with_session_cookie(&sid, response)
}

async fn get_questions(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (sid, session) = resolve_session(&state.sessions, &headers).await;

    let response = match session.questions().await {
        Some(questions) => Json(json!({ "questions": questions })).into_response(),
        None => ApiError::not_found("No questions generated for this session").into_response(),
    };
    with_session_cookie(&sid, response)
}
