//! REST backends the console orchestrates.
//!
//! All backends share [`Client`]: bearer auth, JSON bodies and a status
//! classification that turns token rejections into distinct [`Error`]
//! variants. Each backend declares which of those variants mean "token
//! expired" when it calls [`Client::call`].

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use self::utils::{check_status, ServerError};
use crate::{
    auth::TokenProvider,
    core::{IdParsingError, MissingOrganization},
    retry::{execute_with_retry, ExpiredKind, RetryError},
};

pub mod iam;
pub mod resources;
pub mod runner;
pub mod secrets;
pub mod utils;

/// Non-standard status some backends answer with for an expired or
/// invalid token.
pub const STATUS_TOKEN_INVALID: u16 = 498;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unauthorized: {0}")]
    Unauthorized(#[source] ServerError),
    #[error("forbidden: {0}")]
    Forbidden(#[source] ServerError),
    #[error("token invalid: {0}")]
    TokenInvalid(#[source] ServerError),
    #[error("not found: {0}")]
    NotFound(#[source] ServerError),
    #[error("server: {0}")]
    Server(#[source] ServerError),
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    IdParsing(#[from] IdParsingError),
    #[error(transparent)]
    MissingOrganization(#[from] MissingOrganization),
}

impl From<ServerError> for Error {
    fn from(err: ServerError) -> Self {
        match err.status_code {
            401 => Error::Unauthorized(err),
            403 => Error::Forbidden(err),
            404 => Error::NotFound(err),
            STATUS_TOKEN_INVALID => Error::TokenInvalid(err),
            _ => Error::Server(err),
        }
    }
}

impl Error {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    pub fn is_token_invalid(&self) -> bool {
        matches!(self, Error::TokenInvalid(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub const UNAUTHORIZED: ExpiredKind<Error> = ExpiredKind::new("unauthorized", Error::is_unauthorized);
pub const TOKEN_INVALID: ExpiredKind<Error> =
    ExpiredKind::new("token_invalid", Error::is_token_invalid);

pub type Result<T, E = RetryError<Error>> = std::result::Result<T, E>;

pub struct Client<AuthTokenProvider> {
    pub client: reqwest::Client,
    pub base_url: String,
    pub auth_token_provider: Arc<AuthTokenProvider>,
}

impl<AuthTokenProvider> Client<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider,
{
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        auth_token_provider: Arc<AuthTokenProvider>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            auth_token_provider,
        }
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn build_request(
        &self,
        auth_token: &str,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Request, Error> {
        let builder = self
            .client
            .request(method.clone(), url)
            .bearer_auth(auth_token);

        let builder = match body {
            Some(body) => builder.json(body),
            None if method == Method::POST || method == Method::PUT => {
                builder.header(reqwest::header::CONTENT_LENGTH, 0)
            }
            None => builder,
        };

        builder.build().map_err(Error::Reqwest)
    }

    async fn exec(&self, request: reqwest::Request) -> Result<reqwest::Response, Error> {
        debug!(message = "Sending request", method = %request.method(), url = %request.url());
        let res = self.client.execute(request).await?;
        let res = check_status(res).await?;
        Ok(res)
    }

    /// Empty bodies decode as JSON `null`.
    async fn parse_json<T>(res: reqwest::Response) -> Result<T, Error>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let text = res.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(text)?)
    }

    /// Like [`Client::call`], discarding whatever the backend answers with.
    pub async fn call_discarding(
        &self,
        method: Method,
        path: &str,
        expired: ExpiredKind<Error>,
        also_expired: Option<ExpiredKind<Error>>,
    ) -> Result<()> {
        self.call::<serde::de::IgnoredAny>(method, path, None, expired, also_expired)
            .await?;
        Ok(())
    }

    /// Perform one authenticated call, retried once if the backend
    /// rejects the token with `expired` or `also_expired`.
    pub async fn call<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        expired: ExpiredKind<Error>,
        also_expired: Option<ExpiredKind<Error>>,
    ) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let url = self.build_url(path);
        let url = url.as_str();

        let api_call = |auth_token: String| {
            let method = method.clone();
            async move {
                let request = self.build_request(&auth_token, method, url, body)?;
                let res = self.exec(request).await?;
                Self::parse_json(res).await
            }
        };

        execute_with_retry(
            api_call,
            self.auth_token_provider.as_ref(),
            expired,
            also_expired,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status_code: u16) -> ServerError {
        ServerError {
            status_code,
            body: String::new(),
        }
    }

    #[test]
    fn statuses_are_classified() {
        assert!(matches!(Error::from(server_error(401)), Error::Unauthorized(_)));
        assert!(matches!(Error::from(server_error(403)), Error::Forbidden(_)));
        assert!(matches!(Error::from(server_error(404)), Error::NotFound(_)));
        assert!(matches!(Error::from(server_error(498)), Error::TokenInvalid(_)));
        assert!(matches!(Error::from(server_error(500)), Error::Server(_)));
        assert!(matches!(Error::from(server_error(422)), Error::Server(_)));
    }

    #[test]
    fn expired_kinds_match_their_variant_only() {
        let unauthorized = Error::from(server_error(401));
        let invalid = Error::from(server_error(498));
        let forbidden = Error::from(server_error(403));

        assert!(UNAUTHORIZED.matches(&unauthorized));
        assert!(!UNAUTHORIZED.matches(&invalid));
        assert!(TOKEN_INVALID.matches(&invalid));
        assert!(!TOKEN_INVALID.matches(&unauthorized));
        assert!(!UNAUTHORIZED.matches(&forbidden));
        assert!(!TOKEN_INVALID.matches(&forbidden));
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = Client::new(
            reqwest::Client::new(),
            "http://core.local/api/",
            Arc::new(crate::auth::StaticToken::new("tok")),
        );
        assert_eq!(
            client.build_url("/organizations"),
            "http://core.local/api/organizations"
        );
    }
}
