//! Per-session state: OAuth tokens plus the artifacts of the last pipeline
//! run. Nothing here survives the process; a session is exactly as durable
//! as its cookie.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::TokenStore;

#[derive(Default)]
struct SessionData {
    transcript: Option<String>,
    processed: Option<String>,
    questions: Option<String>,
}

/// Cloneable handle to one user session.
#[derive(Clone, Default)]
pub struct SessionHandle {
    tokens: TokenStore,
    data: Arc<Mutex<SessionData>>,
}

impl SessionHandle {
    /// The session's token store. One store per session; never shared
    /// across sessions.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub async fn transcript(&self) -> Option<String> {
        self.data.lock().await.transcript.clone()
    }

    pub async fn set_transcript(&self, transcript: String) {
        self.data.lock().await.transcript = Some(transcript);
    }

    /// The proofread transcript of the last completed pipeline run.
    pub async fn processed(&self) -> Option<String> {
        self.data.lock().await.processed.clone()
    }

    pub async fn set_processed(&self, processed: String) {
        self.data.lock().await.processed = Some(processed);
    }

    pub async fn questions(&self) -> Option<String> {
        self.data.lock().await.questions.clone()
    }

    pub async fn set_questions(&self, questions: String) {
        self.data.lock().await.questions = Some(questions);
    }
}

/// All live sessions, keyed by the `sid` cookie value.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, SessionHandle>>>,
}

impl SessionStore {
    /// Fetch the session for `id`, creating it on first sight.
    pub async fn session(&self, id: &str) -> SessionHandle {
        self.inner
            .lock()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::default();
        let a = store.session("a").await;
        let b = store.session("b").await;

        a.set_processed("result for a".to_string()).await;
        assert_eq!(a.processed().await.as_deref(), Some("result for a"));
        assert!(b.processed().await.is_none());
    }

    #[tokio::test]
    async fn test_same_id_returns_same_session() {
        let store = SessionStore::default();
        let first = store.session("s1").await;
        first.set_questions("q".to_string()).await;

        let again = store.session("s1").await;
        assert_eq!(again.questions().await.as_deref(), Some("q"));
    }

    #[tokio::test]
    async fn test_result_overwritten_by_next_run() {
        let session = SessionHandle::default();
        session.set_processed("first".to_string()).await;
        session.set_processed("second".to_string()).await;
        assert_eq!(session.processed().await.as_deref(), Some("second"));
    }
}
