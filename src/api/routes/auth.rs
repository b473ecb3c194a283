//! Authorization-code flow endpoints.
//!
//! - GET /auth/login    - redirect to the Zoom consent page
//! - GET /auth/callback - exchange the code, store the session tokens
//! - POST /auth/logout  - drop the session tokens

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{resolve_session, with_session_cookie};
use crate::api::error::ApiError;
use crate::api::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout))
        .with_state(state)
}

async fn login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (sid, session) = resolve_session(&state.sessions, &headers).await;

    // Already authorized sessions skip the consent page.
    let response = if session.tokens().get().await.is_some() {
        Redirect::to("/recordings").into_response()
    } else {
        Redirect::to(&state.oauth.authorize_url()).into_response()
    };
    with_session_cookie(&sid, response)
}

async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Response {
    let (sid, session) = resolve_session(&state.sessions, &headers).await;

    let Some(code) = query.code else {
        return with_session_cookie(
            &sid,
            ApiError::bad_request("Missing authorization code").into_response(),
        );
    };

    let response = match state
        .oauth
        .complete_authorization(session.tokens(), &code)
        .await
    {
        Ok(()) => {
            info!("Session {} authorized", sid.id);
            Redirect::to("/recordings").into_response()
        }
        Err(e) => {
            warn!("Authorization failed for session {}: {}", sid.id, e);
            ApiError::bad_gateway(format!("Failed to get token: {e}")).into_response()
        }
    };
    with_session_cookie(&sid, response)
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (sid, session) = resolve_session(&state.sessions, &headers).await;
    session.tokens().clear().await;
    with_session_cookie(&sid, Json(json!({ "success": true })).into_response())
}
