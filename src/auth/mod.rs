//! Access token supply.
//!
//! Every backend call asks a [`TokenProvider`] for the current access
//! token. Providers may refresh behind the scenes; absence of a token is
//! reported as `None` rather than an error.

pub mod identity;
pub mod session;

#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    type Token: Token;

    /// Returns the best-known access token, refreshing it first if the
    /// provider considers it stale.
    async fn get_auth_token(&self) -> Option<Self::Token>;

    /// Notifies the provider that a backend rejected `access_token` as
    /// expired or invalid, so the next [`get_auth_token`] call refreshes.
    ///
    /// [`get_auth_token`]: TokenProvider::get_auth_token
    async fn token_rejected(&self, _access_token: &str) {}
}

pub trait Token: Send {
    fn access_token(&self) -> &str;
}

pub trait ExpiringToken: Token {
    fn expires_at(&self) -> std::time::Instant;

    /// Refresh token issued alongside the access token, if any.
    fn refresh_token(&self) -> Option<&str> {
        None
    }
}

/// Source of brand new tokens, typically an identity provider.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    type Token: ExpiringToken;
    type Error: std::fmt::Display + Send + Sync;

    /// Issues a token, redeeming `refresh_token` when one is known.
    async fn issue_token(&self, refresh_token: Option<&str>) -> Result<Self::Token, Self::Error>;

    /// Whether `err` means the refresh token itself was refused and
    /// redeeming it again cannot succeed.
    fn is_grant_rejected(_err: &Self::Error) -> bool {
        false
    }
}

impl Token for String {
    fn access_token(&self) -> &str {
        self.as_str()
    }
}

/// Hands out one fixed token and never refreshes.
#[derive(Debug, Clone)]
pub struct StaticToken {
    access_token: String,
}

impl StaticToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticToken {
    type Token = String;

    async fn get_auth_token(&self) -> Option<Self::Token> {
        if self.access_token.is_empty() {
            return None;
        }
        Some(self.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned_every_time() {
        let provider = StaticToken::new("tok-A");
        assert_eq!(provider.get_auth_token().await.as_deref(), Some("tok-A"));
        provider.token_rejected("tok-A").await;
        assert_eq!(provider.get_auth_token().await.as_deref(), Some("tok-A"));
    }

    #[tokio::test]
    async fn empty_static_token_means_no_token() {
        let provider = StaticToken::new("");
        assert!(provider.get_auth_token().await.is_none());
    }
}
