//! Secrets API. Values are passed through untouched and never logged.

use reqwest::Method;
use serde_json::Value;

use super::{Client, Error, Result, TOKEN_INVALID, UNAUTHORIZED};
use crate::{
    auth::TokenProvider,
    core::{check_id, IdRef},
    retry::RetryError,
};

pub struct SecretsApi<AuthTokenProvider> {
    pub client: Client<AuthTokenProvider>,
}

fn secrets_path(organization: &IdRef, name: Option<&IdRef>) -> Result<String, Error> {
    let collection = format!("/organizations/{}/secrets", check_id(organization)?);
    match name {
        Some(name) => Ok(format!("{}/{}", collection, check_id(name)?)),
        None => Ok(collection),
    }
}

impl<AuthTokenProvider> SecretsApi<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider,
{
    pub async fn list(&self, organization: &IdRef) -> Result<Vec<Value>> {
        let path = secrets_path(organization, None).map_err(RetryError::Call)?;
        self.client
            .call(Method::GET, &path, None, UNAUTHORIZED, Some(TOKEN_INVALID))
            .await
    }

    pub async fn put(&self, organization: &IdRef, name: &IdRef, value: &Value) -> Result<Value> {
        let path = secrets_path(organization, Some(name)).map_err(RetryError::Call)?;
        self.client
            .call(Method::PUT, &path, Some(value), UNAUTHORIZED, Some(TOKEN_INVALID))
            .await
    }

    pub async fn delete(&self, organization: &IdRef, name: &IdRef) -> Result<()> {
        let path = secrets_path(organization, Some(name)).map_err(RetryError::Call)?;
        self.client
            .call_discarding(Method::DELETE, &path, UNAUTHORIZED, Some(TOKEN_INVALID))
            .await
    }
}

#[async_trait::async_trait]
impl<AuthTokenProvider> crate::core::Secrets for SecretsApi<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider + 'static,
{
    async fn list(&self, organization: &IdRef) -> Result<Vec<Value>, anyhow::Error> {
        Ok(self.list(organization).await?)
    }

    async fn put(
        &self,
        organization: &IdRef,
        name: &IdRef,
        value: Value,
    ) -> Result<Value, anyhow::Error> {
        Ok(self.put(organization, name, &value).await?)
    }

    async fn delete(&self, organization: &IdRef, name: &IdRef) -> Result<(), anyhow::Error> {
        self.delete(organization, name).await?;
        Ok(())
    }
}
