//! Session-scoped OAuth token storage.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The token set returned by the OAuth token endpoint.
///
/// Fields beyond the two tokens are kept verbatim in `raw` (token_type,
/// scope, api_url and whatever else the platform adds) so a stored set can
/// round-trip without this type chasing the remote schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(flatten)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl TokenSet {
    /// True when this set carries a refresh token usable for an exchange.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Per-session holder of the current [`TokenSet`].
///
/// One store per user session, shared between the route layer and the
/// pipeline via cheap clones. `set` replaces the whole set under the lock,
/// so a reader never observes a half-written token. The store also carries
/// the refresh gate: the async mutex [`crate::auth::TokenRefresher`] holds
/// across a refresh exchange, which is what makes refresh single-flight
/// per session rather than per process.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<Mutex<Option<TokenSet>>>,
    refresh_gate: Arc<Mutex<()>>,
}

impl TokenStore {
    pub async fn get(&self) -> Option<TokenSet> {
        self.inner.lock().await.clone()
    }

    pub async fn set(&self, tokens: TokenSet) {
        *self.inner.lock().await = Some(tokens);
    }

    pub async fn clear(&self) {
        *self.inner.lock().await = None;
    }

    /// The per-session single-flight gate for refresh exchanges.
    pub(crate) fn refresh_gate(&self) -> &Mutex<()> {
        &self.refresh_gate
    }
}
