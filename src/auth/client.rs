//! Bearer-authenticated calls to the remote API with the one documented
//! retry rule: a 401 triggers a single refresh and a single retry, nothing
//! else is ever retried.

use reqwest::StatusCode;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

use super::refresher::TokenRefresher;
use super::token_store::TokenStore;
use super::AuthError;

/// Status and body of a remote API response, after the authentication
/// wrapper has dealt with the 401 case.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures of an authenticated API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no session token; authorization required")]
    Unauthenticated,
    #[error("token refresh failed: {0}")]
    AuthFailed(#[from] AuthError),
    #[error("remote API error ({status}): {body}")]
    RemoteError { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("could not decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Wraps arbitrary remote calls, injecting the session's current access
/// token and refreshing it once on a 401.
///
/// The request itself is a closure taking the bearer token, so callers
/// keep full control of method, URL and body while this type owns the
/// retry rule — and tests can drive it with canned responses.
#[derive(Clone)]
pub struct AuthenticatedClient {
    refresher: TokenRefresher,
}

impl AuthenticatedClient {
    pub fn new(refresher: TokenRefresher) -> Self {
        Self { refresher }
    }

    /// Send a request with the current access token. On a 401 the token is
    /// refreshed (single-flight per session) and the request retried exactly
    /// once; any other non-2xx status is surfaced as
    /// [`ApiError::RemoteError`] without retry.
    pub async fn call<F, Fut>(&self, store: &TokenStore, send: F) -> Result<ApiResponse, ApiError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<ApiResponse, ApiError>>,
    {
        let access = match store.get().await {
            Some(tokens) => tokens.access_token,
            None => return Err(ApiError::Unauthenticated),
        };

        let mut response = send(access.clone()).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            warn!("Remote call returned 401, refreshing session token");
            let fresh = self.refresher.refresh(store, &access).await?;
            response = send(fresh).await?;
        }

        if !response.status.is_success() {
            return Err(ApiError::RemoteError {
                status: response.status,
                body: response.body,
            });
        }

        debug!("Remote call succeeded ({})", response.status);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oauth::TokenExchanger;
    use crate::auth::token_store::TokenSet;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingExchanger {
        exchanges: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenExchanger for CountingExchanger {
        async fn exchange_code(&self, _code: &str) -> Result<TokenSet, AuthError> {
            unimplemented!("not used in client tests")
        }

        async fn exchange_refresh(&self, _refresh_token: &str) -> Result<TokenSet, AuthError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AuthError::RefreshRejected {
                    status: 400,
                    body: "invalid_grant".to_string(),
                });
            }
            Ok(TokenSet {
                access_token: "fresh".to_string(),
                refresh_token: "r2".to_string(),
                expires_in: Some(3600),
                raw: serde_json::Map::new(),
            })
        }
    }

    fn client(fail_refresh: bool) -> (AuthenticatedClient, Arc<CountingExchanger>) {
        let exchanger = Arc::new(CountingExchanger {
            exchanges: AtomicUsize::new(0),
            fail: fail_refresh,
        });
        (
            AuthenticatedClient::new(TokenRefresher::new(exchanger.clone())),
            exchanger,
        )
    }

    async fn seeded_store() -> TokenStore {
        let store = TokenStore::default();
        store
            .set(TokenSet {
                access_token: "stale".to_string(),
                refresh_token: "r1".to_string(),
                expires_in: Some(3600),
                raw: serde_json::Map::new(),
            })
            .await;
        store
    }

    #[tokio::test]
    async fn test_empty_store_fails_without_sending() {
        let (client, _) = client(false);
        let store = TokenStore::default();
        let sends = AtomicUsize::new(0);

        let err = client
            .call(&store, |_token| {
                sends.fetch_add(1, Ordering::SeqCst);
                async { Ok(ApiResponse::new(StatusCode::OK, "")) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthenticated));
        assert_eq!(sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_401_then_200_refreshes_once_and_retries() {
        let (client, exchanger) = client(false);
        let store = seeded_store().await;
        let sends = Arc::new(AtomicUsize::new(0));

        let response = client
            .call(&store, |token| {
                let sends = sends.clone();
                async move {
                    sends.fetch_add(1, Ordering::SeqCst);
                    if token == "stale" {
                        Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "expired"))
                    } else {
                        assert_eq!(token, "fresh");
                        Ok(ApiResponse::new(StatusCode::OK, "payload"))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "payload");
        assert_eq!(sends.load(Ordering::SeqCst), 2);
        assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates_as_auth_failed() {
        let (client, exchanger) = client(true);
        let store = seeded_store().await;

        let err = client
            .call(&store, |_token| async {
                Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "expired"))
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::AuthFailed(AuthError::RefreshRejected { status: 400, .. })
        ));
        assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_401_is_not_retried_again() {
        let (client, exchanger) = client(false);
        let store = seeded_store().await;
        let sends = Arc::new(AtomicUsize::new(0));

        let err = client
            .call(&store, |_token| {
                let sends = sends.clone();
                async move {
                    sends.fetch_add(1, Ordering::SeqCst);
                    Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "still expired"))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::RemoteError {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        ));
        assert_eq!(sends.load(Ordering::SeqCst), 2);
        assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_surfaces_without_retry() {
        let (client, exchanger) = client(false);
        let store = seeded_store().await;
        let sends = Arc::new(AtomicUsize::new(0));

        let err = client
            .call(&store, |_token| {
                let sends = sends.clone();
                async move {
                    sends.fetch_add(1, Ordering::SeqCst);
                    Ok(ApiResponse::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "boom",
                    ))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::RemoteError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            }
        ));
        assert_eq!(sends.load(Ordering::SeqCst), 1);
        assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let (client, exchanger) = client(false);
        let store = seeded_store().await;

        let run = |client: AuthenticatedClient, store: TokenStore| {
            tokio::spawn(async move {
                client
                    .call(&store, |token| async move {
                        if token == "stale" {
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                            Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "expired"))
                        } else {
                            Ok(ApiResponse::new(StatusCode::OK, "payload"))
                        }
                    })
                    .await
            })
        };

        let a = run(client.clone(), store.clone());
        let b = run(client.clone(), store.clone());

        assert_eq!(a.await.unwrap().unwrap().body, "payload");
        assert_eq!(b.await.unwrap().unwrap().body, "payload");
        assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 1);
    }
}
