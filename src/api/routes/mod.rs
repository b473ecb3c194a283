//! Route modules plus the session-cookie plumbing they share.

pub mod auth;
pub mod pipeline;
pub mod recordings;

use axum::http::{header, HeaderMap};
use axum::response::Response;
use uuid::Uuid;

use crate::api::AppState;
use crate::session::{SessionHandle, SessionStore};

const SESSION_COOKIE: &str = "sid";

/// Session identity for one request, minted when the request carried no
/// cookie.
pub struct Sid {
    pub id: String,
    pub minted: bool,
}

pub fn sid_from_headers(headers: &HeaderMap) -> Sid {
    let existing = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == SESSION_COOKIE).then(|| value.to_string())
            })
        });

    match existing {
        Some(id) if !id.is_empty() => Sid { id, minted: false },
        _ => Sid {
            id: Uuid::new_v4().to_string(),
            minted: true,
        },
    }
}

/// Resolve (or create) the session for this request.
pub async fn resolve_session(sessions: &SessionStore, headers: &HeaderMap) -> (Sid, SessionHandle) {
    let sid = sid_from_headers(headers);
    let session = sessions.session(&sid.id).await;
    (sid, session)
}

/// Attach the session cookie to a response when it was minted for this
/// request.
pub fn with_session_cookie(sid: &Sid, mut response: Response) -> Response {
    if sid.minted {
        if let Ok(value) =
            format!("{}={}; HttpOnly; Path=/", SESSION_COOKIE, sid.id).parse()
        {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// All session-facing routes.
pub fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .merge(auth::router(state.clone()))
        .merge(recordings::router(state.clone()))
        .merge(pipeline::router(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_sid_parsed_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sid=abc-123; lang=en"),
        );
        let sid = sid_from_headers(&headers);
        assert_eq!(sid.id, "abc-123");
        assert!(!sid.minted);
    }

    #[test]
    fn test_sid_minted_when_absent() {
        let sid = sid_from_headers(&HeaderMap::new());
        assert!(sid.minted);
        assert!(!sid.id.is_empty());
    }
}
