//! Obtain tokens from the identity provider's OAuth 2.0 token endpoint.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::backend::utils::{check_status, ServerError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("server: {0}")]
    Server(#[from] ServerError),
    #[error("form encoding: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
    #[error("client credentials grant requires a client secret")]
    MissingClientSecret,
}

/// Longer lifetimes announced by the identity provider are cut down to this.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant<'a> {
    ClientCredentials,
    RefreshToken(&'a str),
}

impl Grant<'_> {
    fn grant_type(&self) -> &'static str {
        match self {
            Grant::ClientCredentials => "client_credentials",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }
}

pub struct IdentityClient {
    pub client: reqwest::Client,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
}

impl IdentityClient {
    /// Redeem `grant` at the token endpoint.
    pub async fn perform(&self, grant: Grant<'_>) -> Result<AuthResponse, Error> {
        let scope = self.scopes.join(" ");

        let mut params = vec![
            ("grant_type", grant.grant_type()),
            ("client_id", self.client_id.as_str()),
        ];
        match grant {
            Grant::ClientCredentials => {
                let secret = self
                    .client_secret
                    .as_deref()
                    .ok_or(Error::MissingClientSecret)?;
                params.push(("client_secret", secret));
            }
            Grant::RefreshToken(refresh_token) => {
                if let Some(secret) = self.client_secret.as_deref() {
                    params.push(("client_secret", secret));
                }
                params.push(("refresh_token", refresh_token));
            }
        }
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }
        let params = serde_urlencoded::to_string(&params)?;

        debug!(message = "Requesting token", grant_type = grant.grant_type(), token_url = %self.token_url);

        let req = self
            .client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(params)
            .build()?;

        let res = self.client.execute(req).await?;
        let res = check_status(res).await?;
        let auth_response = res.json().await?;
        Ok(auth_response)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    /// The requested access token.
    access_token: String,
    /// The amount of time that an access token is valid (in seconds).
    expires_in: u64,
    /// Present when the provider issues or rotates a refresh token.
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub expires_at: Instant,
    pub refresh_token: Option<String>,
}

impl From<AuthResponse> for Token {
    fn from(auth: AuthResponse) -> Self {
        let AuthResponse {
            access_token,
            expires_in,
            refresh_token,
        } = auth;
        let expires_in = Duration::from_secs(expires_in).min(MAX_TOKEN_LIFETIME);
        let expires_at = Instant::now() + expires_in;
        Self {
            access_token,
            expires_at,
            refresh_token,
        }
    }
}

#[async_trait::async_trait]
impl super::TokenSource for IdentityClient {
    type Token = Token;
    type Error = Error;

    async fn issue_token(&self, refresh_token: Option<&str>) -> Result<Self::Token, Self::Error> {
        let grant = match refresh_token {
            Some(refresh_token) => Grant::RefreshToken(refresh_token),
            None => Grant::ClientCredentials,
        };
        let auth_response = self.perform(grant).await?;
        Ok(auth_response.into())
    }

    /// `invalid_grant` and friends come back as 400.
    fn is_grant_rejected(err: &Self::Error) -> bool {
        matches!(err, Error::Server(ServerError { status_code: 400, .. }))
    }
}

impl super::Token for Token {
    fn access_token(&self) -> &str {
        self.access_token.as_str()
    }
}

impl super::ExpiringToken for Token {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }

    fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}
