//! Retry-once on token expiry.
//!
//! [`execute_with_retry`] fetches a token, performs the call and, if the
//! backend rejected the token as expired, fetches a token again and
//! repeats the call exactly once. Any other failure is returned as is.

use std::{fmt, future::Future};

use tracing::{debug, info, warn};

use crate::auth::{Token, TokenProvider};

/// Recognizes the errors a backend raises when it rejects a token.
pub struct ExpiredKind<E> {
    name: &'static str,
    matches: fn(&E) -> bool,
}

impl<E> ExpiredKind<E> {
    pub const fn new(name: &'static str, matches: fn(&E) -> bool) -> Self {
        Self { name, matches }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, err: &E) -> bool {
        (self.matches)(err)
    }
}

impl<E> Clone for ExpiredKind<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ExpiredKind<E> {}

impl<E> fmt::Debug for ExpiredKind<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExpiredKind").field(&self.name).finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The provider had no token before the first attempt.
    #[error("no access token available")]
    NoToken,
    /// The provider had no token after the backend rejected the first one.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    #[error(transparent)]
    Call(E),
}

impl<E> RetryError<E> {
    /// Whether the caller has to sign in again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, RetryError::NoToken | RetryError::RefreshFailed(_))
    }
}

/// Run `api_call` with a token from `provider`, retrying once with a
/// fresh token if it fails with `expired` or `also_expired`.
///
/// `api_call` runs at most twice and `provider` is asked for a token at
/// most twice.
pub async fn execute_with_retry<P, F, Fut, T, E>(
    mut api_call: F,
    provider: &P,
    expired: ExpiredKind<E>,
    also_expired: Option<ExpiredKind<E>>,
) -> Result<T, RetryError<E>>
where
    P: TokenProvider + ?Sized,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let token = match fetch_token(provider).await {
        Some(token) => token,
        None => {
            debug!(message = "No access token available, call not attempted");
            return Err(RetryError::NoToken);
        }
    };

    debug!(message = "Calling backend", attempt = 1);
    let err = match api_call(token.clone()).await {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let kind = match [Some(expired), also_expired]
        .into_iter()
        .flatten()
        .find(|kind| kind.matches(&err))
    {
        Some(kind) => kind,
        None => return Err(RetryError::Call(err)),
    };

    info!(
        message = "Access token rejected, refreshing and retrying once",
        expired_kind = kind.name(),
        error = %err,
    );
    drop(err);

    provider.token_rejected(&token).await;

    let new_token = fetch_token(provider).await.ok_or_else(|| {
        RetryError::RefreshFailed(format!(
            "no access token after refresh ({} rejection)",
            kind.name()
        ))
    })?;

    if new_token == token {
        warn!(
            message = "Token unchanged after refresh, retrying anyway",
            expired_kind = kind.name(),
        );
    }

    debug!(message = "Calling backend", attempt = 2);
    api_call(new_token).await.map_err(RetryError::Call)
}

async fn fetch_token<P>(provider: &P) -> Option<String>
where
    P: TokenProvider + ?Sized,
{
    let token = provider.get_auth_token().await?;
    let access_token = token.access_token();
    if access_token.is_empty() {
        return None;
    }
    Some(access_token.to_owned())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        future::{ready, Ready},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use super::*;

    #[derive(Debug, PartialEq, Eq, thiserror::Error)]
    enum FakeError {
        #[error("expired: {0}")]
        Expired(&'static str),
        #[error("invalid token")]
        Invalid,
        #[error("other: {0}")]
        Other(&'static str),
    }

    fn is_expired(err: &FakeError) -> bool {
        matches!(err, FakeError::Expired(_))
    }

    fn is_invalid(err: &FakeError) -> bool {
        matches!(err, FakeError::Invalid)
    }

    const EXPIRED: ExpiredKind<FakeError> = ExpiredKind::new("expired", is_expired);
    const INVALID: ExpiredKind<FakeError> = ExpiredKind::new("invalid", is_invalid);

    /// Hands out the queued tokens in order, then nothing.
    struct QueuedTokens {
        tokens: Mutex<VecDeque<Option<&'static str>>>,
        calls: AtomicUsize,
        rejected: Mutex<Vec<String>>,
    }

    impl QueuedTokens {
        fn new(tokens: &[Option<&'static str>]) -> Self {
            Self {
                tokens: Mutex::new(tokens.iter().copied().collect()),
                calls: AtomicUsize::new(0),
                rejected: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TokenProvider for QueuedTokens {
        type Token = String;

        async fn get_auth_token(&self) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.tokens.lock().unwrap().pop_front().flatten();
            next.map(str::to_owned)
        }

        async fn token_rejected(&self, access_token: &str) {
            self.rejected.lock().unwrap().push(access_token.to_owned());
        }
    }

    /// Replays scripted outcomes and records the token of each call.
    struct Script {
        outcomes: Mutex<VecDeque<Result<&'static str, FakeError>>>,
        seen: Mutex<Vec<String>>,
    }

    impl Script {
        fn new(outcomes: Vec<Result<&'static str, FakeError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn call(&self, token: String) -> Ready<Result<&'static str, FakeError>> {
            self.seen.lock().unwrap().push(token);
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("call made more often than scripted");
            ready(outcome)
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn success_calls_provider_and_backend_once() {
        let provider = QueuedTokens::new(&[Some("tok-A")]);
        let script = Script::new(vec![Ok("done")]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(provider.calls(), 1);
        assert_eq!(script.seen(), vec!["tok-A"]);
    }

    #[tokio::test]
    async fn unrelated_error_is_not_retried() {
        let provider = QueuedTokens::new(&[Some("tok-A"), Some("tok-B")]);
        let script = Script::new(vec![Err(FakeError::Other("validation"))]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        match result {
            Err(RetryError::Call(err)) => assert_eq!(err, FakeError::Other("validation")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(provider.calls(), 1);
        assert_eq!(script.seen().len(), 1);
        assert!(provider.rejected.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_retried() {
        let provider = QueuedTokens::new(&[Some("tok-A"), Some("tok-B")]);
        let script = Script::new(vec![Err(FakeError::Expired("expired")), Ok("ok")]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(provider.calls(), 2);
        assert_eq!(script.seen(), vec!["tok-A", "tok-B"]);
        assert_eq!(*provider.rejected.lock().unwrap(), vec!["tok-A"]);
    }

    #[tokio::test]
    async fn second_expiry_is_returned_without_another_retry() {
        let provider = QueuedTokens::new(&[Some("tok-A"), Some("tok-B"), Some("tok-C")]);
        let script = Script::new(vec![
            Err(FakeError::Expired("first")),
            Err(FakeError::Expired("second")),
        ]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        match result {
            Err(RetryError::Call(err)) => assert_eq!(err, FakeError::Expired("second")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(provider.calls(), 2);
        assert_eq!(script.seen().len(), 2);
    }

    #[tokio::test]
    async fn missing_token_after_expiry_is_a_refresh_failure() {
        let provider = QueuedTokens::new(&[Some("tok-A"), None]);
        let script = Script::new(vec![Err(FakeError::Expired("expired"))]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::RefreshFailed(_)));
        assert!(err.is_auth_failure());
        assert_eq!(provider.calls(), 2);
        assert_eq!(script.seen().len(), 1);
    }

    #[tokio::test]
    async fn either_declared_kind_triggers_the_retry() {
        for first in [FakeError::Expired("expired"), FakeError::Invalid] {
            let provider = QueuedTokens::new(&[Some("tok-A"), Some("tok-B")]);
            let script = Script::new(vec![Err(first), Ok("ok")]);

            let result =
                execute_with_retry(|t| script.call(t), &provider, EXPIRED, Some(INVALID)).await;

            assert_eq!(result.unwrap(), "ok");
            assert_eq!(script.seen(), vec!["tok-A", "tok-B"]);
        }

        let provider = QueuedTokens::new(&[Some("tok-A"), Some("tok-B")]);
        let script = Script::new(vec![Err(FakeError::Other("denied"))]);
        let result =
            execute_with_retry(|t| script.call(t), &provider, EXPIRED, Some(INVALID)).await;
        assert!(matches!(
            result,
            Err(RetryError::Call(FakeError::Other("denied")))
        ));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn undeclared_kind_is_not_retried() {
        let provider = QueuedTokens::new(&[Some("tok-A"), Some("tok-B")]);
        let script = Script::new(vec![Err(FakeError::Invalid)]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        assert!(matches!(result, Err(RetryError::Call(FakeError::Invalid))));
        assert_eq!(script.seen().len(), 1);
    }

    #[tokio::test]
    async fn no_initial_token_skips_the_call() {
        let provider = QueuedTokens::new(&[None]);
        let script = Script::new(vec![]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        assert!(matches!(result, Err(RetryError::NoToken)));
        assert_eq!(provider.calls(), 1);
        assert!(script.seen().is_empty());
    }

    #[tokio::test]
    async fn empty_token_counts_as_no_token() {
        let provider = QueuedTokens::new(&[Some("")]);
        let script = Script::new(vec![]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        assert!(matches!(result, Err(RetryError::NoToken)));
        assert!(script.seen().is_empty());
    }

    #[tokio::test]
    async fn unchanged_token_is_retried_anyway() {
        let provider = QueuedTokens::new(&[Some("tok-A"), Some("tok-A")]);
        let script = Script::new(vec![Err(FakeError::Expired("expired")), Ok("ok")]);

        let result = execute_with_retry(|t| script.call(t), &provider, EXPIRED, None).await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(script.seen(), vec!["tok-A", "tok-A"]);
    }

    #[test]
    fn call_errors_display_unchanged() {
        let err: RetryError<FakeError> = RetryError::Call(FakeError::Other("boom"));
        assert_eq!(err.to_string(), "other: boom");
        assert!(matches!(err, RetryError::Call(FakeError::Other("boom"))));
        assert!(!err.is_auth_failure());
    }
}
