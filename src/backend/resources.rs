//! Core resource API: organizations and the projects, modules,
//! repositories, deployments and runs inside them.

use reqwest::Method;
use serde_json::Value;

use super::{Client, Error, Result, UNAUTHORIZED};
use crate::{
    auth::TokenProvider,
    core::{check_id, IdRef, MissingOrganization, ResourceKind},
    retry::RetryError,
};

pub struct ResourceApi<AuthTokenProvider> {
    pub client: Client<AuthTokenProvider>,
}

fn collection_path(kind: ResourceKind, organization: Option<&IdRef>) -> Result<String, Error> {
    if !kind.is_scoped() {
        return Ok(format!("/{}", kind.collection()));
    }
    let organization = organization.ok_or(MissingOrganization(kind))?;
    Ok(format!(
        "/organizations/{}/{}",
        check_id(organization)?,
        kind.collection()
    ))
}

fn item_path(kind: ResourceKind, organization: Option<&IdRef>, id: &IdRef) -> Result<String, Error> {
    let collection = collection_path(kind, organization)?;
    Ok(format!("{}/{}", collection, check_id(id)?))
}

impl<AuthTokenProvider> ResourceApi<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider,
{
    pub async fn list(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
    ) -> Result<Vec<Value>> {
        let path = collection_path(kind, organization).map_err(RetryError::Call)?;
        self.client
            .call(Method::GET, &path, None, UNAUTHORIZED, None)
            .await
    }

    /// A resource the backend does not know is `None`, not an error.
    pub async fn get(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
    ) -> Result<Option<Value>> {
        let path = item_path(kind, organization, id).map_err(RetryError::Call)?;
        match self
            .client
            .call(Method::GET, &path, None, UNAUTHORIZED, None)
            .await
        {
            Ok(resource) => Ok(Some(resource)),
            Err(RetryError::Call(err)) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn create(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        payload: &Value,
    ) -> Result<Value> {
        let path = collection_path(kind, organization).map_err(RetryError::Call)?;
        self.client
            .call(Method::POST, &path, Some(payload), UNAUTHORIZED, None)
            .await
    }

    pub async fn update(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
        payload: &Value,
    ) -> Result<Value> {
        let path = item_path(kind, organization, id).map_err(RetryError::Call)?;
        self.client
            .call(Method::PUT, &path, Some(payload), UNAUTHORIZED, None)
            .await
    }

    pub async fn delete(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
    ) -> Result<()> {
        let path = item_path(kind, organization, id).map_err(RetryError::Call)?;
        self.client
            .call_discarding(Method::DELETE, &path, UNAUTHORIZED, None)
            .await
    }
}

#[async_trait::async_trait]
impl<AuthTokenProvider> crate::core::Resources for ResourceApi<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider + 'static,
{
    async fn list(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
    ) -> Result<Vec<Value>, anyhow::Error> {
        Ok(self.list(kind, organization).await?)
    }

    async fn get(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
    ) -> Result<Option<Value>, anyhow::Error> {
        Ok(self.get(kind, organization, id).await?)
    }

    async fn create(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        payload: Value,
    ) -> Result<Value, anyhow::Error> {
        Ok(self.create(kind, organization, &payload).await?)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
        payload: Value,
    ) -> Result<Value, anyhow::Error> {
        Ok(self.update(kind, organization, id, &payload).await?)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
    ) -> Result<(), anyhow::Error> {
        self.delete(kind, organization, id).await?;
        Ok(())
    }
}
