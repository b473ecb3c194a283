//! OAuth2 session handling for the Zoom API.
//!
//! The token lifecycle is split the same way the remote API forces it to be:
//! a per-session [`TokenStore`] owns the current token set, [`ZoomOauth`]
//! performs the grant exchanges, [`TokenRefresher`] coordinates the
//! single-flight refresh, and [`AuthenticatedClient`] applies the one
//! 401 → refresh → retry rule to arbitrary API calls.

pub mod client;
pub mod oauth;
pub mod refresher;
pub mod token_store;

pub use client::{ApiError, ApiResponse, AuthenticatedClient};
pub use oauth::{TokenExchanger, ZoomOauth};
pub use refresher::TokenRefresher;
pub use token_store::{TokenSet, TokenStore};

use thiserror::Error;

/// Failures of the token lifecycle. `NoSession` and the rejected variants
/// all mean the same thing to the caller: restart the authorization-code
/// flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no refresh token in session; authorization required")]
    NoSession,
    #[error("token refresh rejected ({status}): {body}")]
    RefreshRejected { status: u16, body: String },
    #[error("authorization code rejected ({status}): {body}")]
    ExchangeRejected { status: u16, body: String },
    #[error("could not parse token response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("token endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),
}
