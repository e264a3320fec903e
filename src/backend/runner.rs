//! Runner API: execution logs of runs.
//!
//! The runner answers 498 for a token it considers expired and 401 when
//! the token is missing or unknown; both are worth a refresh.

use reqwest::Method;
use serde_json::Value;

use super::{Client, Error, Result, TOKEN_INVALID, UNAUTHORIZED};
use crate::{
    auth::TokenProvider,
    core::{check_id, IdRef},
    retry::RetryError,
};

pub struct RunnerApi<AuthTokenProvider> {
    pub client: Client<AuthTokenProvider>,
}

fn logs_path(organization: &IdRef, run: &IdRef) -> Result<String, Error> {
    Ok(format!(
        "/organizations/{}/runs/{}/logs",
        check_id(organization)?,
        check_id(run)?
    ))
}

impl<AuthTokenProvider> RunnerApi<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider,
{
    pub async fn run_logs(&self, organization: &IdRef, run: &IdRef) -> Result<Value> {
        let path = logs_path(organization, run).map_err(RetryError::Call)?;
        self.client
            .call(Method::GET, &path, None, TOKEN_INVALID, Some(UNAUTHORIZED))
            .await
    }
}

#[async_trait::async_trait]
impl<AuthTokenProvider> crate::core::RunLogs for RunnerApi<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider + 'static,
{
    async fn run_logs(&self, organization: &IdRef, run: &IdRef) -> Result<Value, anyhow::Error> {
        Ok(self.run_logs(organization, run).await?)
    }
}
