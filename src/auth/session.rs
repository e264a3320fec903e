use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{ExpiringToken, TokenSource};

pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Caches the console's access token and refreshes it through a
/// [`TokenSource`] once it is stale.
///
/// Refreshes are serialized by the session lock, so callers racing on a
/// stale token trigger a single refresh.
pub struct Session<Source>
where
    Source: TokenSource,
{
    source: Source,
    expiry_skew: Duration,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    record: Option<Record>,
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub access_token: String,
    pub expires_at: Instant,
    rejected: bool,
}

impl Record {
    pub fn from_expiring_token<T: ExpiringToken>(token: &T) -> Self {
        Self {
            access_token: token.access_token().to_owned(),
            expires_at: token.expires_at(),
            rejected: false,
        }
    }

    /// A skew reaching past the end of time makes every token stale.
    pub fn is_stale(&self, skew: Duration) -> bool {
        if self.rejected {
            return true;
        }
        match Instant::now().checked_add(skew) {
            Some(deadline) => deadline >= self.expires_at,
            None => true,
        }
    }
}

impl super::Token for Record {
    fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl<Source> Session<Source>
where
    Source: TokenSource,
{
    pub fn new(source: Source) -> Self {
        Self {
            source,
            expiry_skew: DEFAULT_EXPIRY_SKEW,
            state: Mutex::new(State::default()),
        }
    }

    /// Seed the session with a refresh token obtained out of band.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.state.get_mut().refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
        self.expiry_skew = skew;
        self
    }

    pub async fn get_token(&self) -> Option<Record> {
        let mut state = self.state.lock().await;

        if let Some(record) = &state.record {
            if !record.is_stale(self.expiry_skew) {
                debug!(message = "Using preexisting token", token_expires_at = ?record.expires_at);
                return Some(record.clone());
            }
            debug!(
                message = "Existing token is stale, refreshing",
                token_expires_at = ?record.expires_at,
                token_rejected = record.rejected,
            );
        }

        info!(
            message = "No usable token found, about to get a new one",
            token_is_stale = state.record.is_some(),
            has_refresh_token = state.refresh_token.is_some(),
        );

        state.record = None;
        let issued = self
            .source
            .issue_token(state.refresh_token.as_deref())
            .await;

        let token = match issued {
            Ok(token) => token,
            Err(err) => {
                if state.refresh_token.is_some() && Source::is_grant_rejected(&err) {
                    warn!(
                        message = "Refresh token rejected, dropping it",
                        error = %err,
                    );
                    state.refresh_token = None;
                } else {
                    warn!(message = "Token refresh failed", error = %err);
                }
                return None;
            }
        };

        if let Some(refresh_token) = token.refresh_token() {
            state.refresh_token = Some(refresh_token.to_owned());
        }
        let record = Record::from_expiring_token(&token);
        state.record = Some(record.clone());

        debug!(message = "Got new token", token_expires_at = ?record.expires_at);

        Some(record)
    }

    /// Mark the cached token stale if it is still `access_token`.
    pub async fn reject(&self, access_token: &str) {
        let mut state = self.state.lock().await;
        match state.record.as_mut() {
            Some(record) if record.access_token == access_token => {
                debug!(message = "Cached token rejected by a backend", token_expires_at = ?record.expires_at);
                record.rejected = true;
            }
            Some(_) => debug!(message = "Rejected token was already replaced"),
            None => {}
        }
    }
}

#[async_trait::async_trait]
impl<Source> super::TokenProvider for Session<Source>
where
    Source: TokenSource,
{
    type Token = Record;

    async fn get_auth_token(&self) -> Option<Self::Token> {
        self.get_token().await
    }

    async fn token_rejected(&self, access_token: &str) {
        self.reject(access_token).await
    }
}
