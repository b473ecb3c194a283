//! Grant exchanges against the Zoom OAuth token endpoint.

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info};

use super::token_store::{TokenSet, TokenStore};
use super::AuthError;

/// Capability seam for the token endpoint, so refresh coordination and the
/// authorization flow can be exercised against deterministic fakes.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// `grant_type=authorization_code` exchange.
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError>;

    /// `grant_type=refresh_token` exchange. The refresh token is single-use
    /// on the remote side; callers must not issue two exchanges from the
    /// same token.
    async fn exchange_refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError>;
}

/// OAuth client registration plus endpoint URLs.
#[derive(Debug, Clone)]
pub struct OauthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
}

/// Real token-endpoint client using HTTP Basic authentication with the
/// registered client credentials, as the Zoom token API requires.
pub struct ZoomOauth {
    client: reqwest::Client,
    settings: OauthSettings,
}

impl ZoomOauth {
    pub fn new(settings: OauthSettings) -> Self {
        info!(
            "Initialized OAuth client for token endpoint {}",
            settings.token_url
        );
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    /// Build the consent-page URL the user is redirected to at the start of
    /// the authorization-code flow.
    pub fn authorize_url(&self) -> String {
        Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
            ],
        )
        .map(Into::into)
        .unwrap_or_else(|_| self.settings.authorize_url.clone())
    }

    /// Exchange the callback code and store the resulting token set,
    /// completing the authorization flow for this session.
    pub async fn complete_authorization(
        &self,
        store: &TokenStore,
        code: &str,
    ) -> Result<(), AuthError> {
        let tokens = self.exchange_code(code).await?;
        store.set(tokens).await;
        info!("Authorization complete, session token stored");
        Ok(())
    }

    async fn post_grant(
        &self,
        params: &[(&str, &str)],
        rejected: impl FnOnce(u16, String) -> AuthError,
    ) -> Result<TokenSet, AuthError> {
        let response = self
            .client
            .post(&self.settings.token_url)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(params)
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Transport)?;

        if !status.is_success() {
            return Err(rejected(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(AuthError::MalformedResponse)
    }
}

#[async_trait]
impl TokenExchanger for ZoomOauth {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        debug!("Exchanging authorization code for tokens");
        self.post_grant(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.settings.redirect_uri),
            ],
            |status, body| AuthError::ExchangeRejected { status, body },
        )
        .await
    }

    async fn exchange_refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        debug!("Exchanging refresh token for a new token set");
        self.post_grant(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            |status, body| AuthError::RefreshRejected { status, body },
        )
        .await
    }
}
