//! Cloud-recording listing.
//!
//! - GET /recordings - the session user's cloud recordings

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{resolve_session, with_session_cookie};
use crate::api::error::ApiError;
use crate::api::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Start of the date range, `YYYY-MM-DD`. Defaults to 2023-01-01.
    pub from: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/recordings", get(list))
        .with_state(state)
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    let (sid, session) = resolve_session(&state.sessions, &headers).await;

    let result = state
        .recordings
        .list_recordings(session.tokens(), query.from.as_deref())
        .await;

    let response = match result {
        Ok(meetings) => Json(json!({ "meetings": meetings })).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    };
    with_session_cookie(&sid, response)
}
