//! Single-flight refresh of an expired access token.

use std::sync::Arc;
use tracing::{debug, info};

use super::oauth::TokenExchanger;
use super::token_store::TokenStore;
use super::AuthError;

/// Exchanges a refresh token for a new token set and installs it in the
/// session's [`TokenStore`].
///
/// The refresh token is single-use on the remote side: two concurrent
/// exchanges from the same refresh token would invalidate the session.
/// Callers therefore pass the access token they observed as stale; while
/// one refresh is in flight, late arrivals wait on the store's gate and
/// then find the token already replaced, so only one network exchange
/// happens per stale token.
#[derive(Clone)]
pub struct TokenRefresher {
    exchanger: Arc<dyn TokenExchanger>,
}

impl TokenRefresher {
    pub fn new(exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self { exchanger }
    }

    /// Refresh the session's token set, returning the new access token.
    ///
    /// Fails with [`AuthError::NoSession`] when the store holds no usable
    /// refresh token; no network call is made in that case. On any failure
    /// the stored token set is left unchanged.
    pub async fn refresh(&self, store: &TokenStore, stale_access: &str) -> Result<String, AuthError> {
        let _guard = store.refresh_gate().lock().await;

        // A refresh that completed while we waited already replaced the set.
        if let Some(current) = store.get().await {
            if current.access_token != stale_access && !current.access_token.is_empty() {
                debug!("Token already refreshed by a concurrent caller");
                return Ok(current.access_token);
            }
        }

        let refresh_token = match store.get().await {
            Some(tokens) if tokens.can_refresh() => tokens.refresh_token,
            _ => return Err(AuthError::NoSession),
        };

        let tokens = self.exchanger.exchange_refresh(&refresh_token).await?;
        let access = tokens.access_token.clone();
        store.set(tokens).await;

        info!("Session token refreshed");
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_store::TokenSet;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeExchanger {
        exchanges: AtomicUsize,
        delay: Duration,
    }

    impl FakeExchanger {
        fn new() -> Self {
            Self {
                exchanges: AtomicUsize::new(0),
                delay: Duration::from_millis(0),
            }
        }

        fn slow() -> Self {
            Self {
                exchanges: AtomicUsize::new(0),
                delay: Duration::from_millis(50),
            }
        }
    }

    #[async_trait]
    impl TokenExchanger for FakeExchanger {
        async fn exchange_code(&self, _code: &str) -> Result<TokenSet, AuthError> {
            unimplemented!("not used in refresher tests")
        }

        async fn exchange_refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
            tokio::time::sleep(self.delay).await;
            let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenSet {
                access_token: format!("access-{n}"),
                refresh_token: format!("{refresh_token}-next"),
                expires_in: Some(3600),
                raw: serde_json::Map::new(),
            })
        }
    }

    async fn seed(store: &TokenStore, access: &str, refresh: &str) {
        store
            .set(TokenSet {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
                expires_in: Some(3600),
                raw: serde_json::Map::new(),
            })
            .await;
    }

    #[tokio::test]
    async fn test_refresh_replaces_token_set() {
        let store = TokenStore::default();
        seed(&store, "stale", "r1").await;
        let refresher = TokenRefresher::new(Arc::new(FakeExchanger::new()));

        let access = refresher.refresh(&store, "stale").await.unwrap();
        assert_eq!(access, "access-1");
        let current = store.get().await.unwrap();
        assert_eq!(current.access_token, "access-1");
        assert_eq!(current.refresh_token, "r1-next");
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_network() {
        let store = TokenStore::default();
        seed(&store, "stale", "").await;
        let exchanger = Arc::new(FakeExchanger::new());
        let refresher = TokenRefresher::new(exchanger.clone());

        let err = refresher.refresh(&store, "stale").await.unwrap_err();
        assert!(matches!(err, AuthError::NoSession));
        assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_store_fails_with_no_session() {
        let store = TokenStore::default();
        let refresher = TokenRefresher::new(Arc::new(FakeExchanger::new()));
        let err = refresher.refresh(&store, "whatever").await.unwrap_err();
        assert!(matches!(err, AuthError::NoSession));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let store = TokenStore::default();
        seed(&store, "stale", "r1").await;
        let exchanger = Arc::new(FakeExchanger::slow());
        let refresher = TokenRefresher::new(exchanger.clone());

        let a = {
            let refresher = refresher.clone();
            let store = store.clone();
            tokio::spawn(async move { refresher.refresh(&store, "stale").await })
        };
        let b = {
            let refresher = refresher.clone();
            let store = store.clone();
            tokio::spawn(async move { refresher.refresh(&store, "stale").await })
        };

        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();

        assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(first, "access-1");
        assert_eq!(second, "access-1");
    }

    #[tokio::test]
    async fn test_already_refreshed_token_is_reused() {
        let store = TokenStore::default();
        seed(&store, "fresh", "r1").await;
        let exchanger = Arc::new(FakeExchanger::new());
        let refresher = TokenRefresher::new(exchanger.clone());

        // Caller observed "stale" but the store has already moved on.
        let access = refresher.refresh(&store, "stale").await.unwrap();
        assert_eq!(access, "fresh");
        assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 0);
    }
}
