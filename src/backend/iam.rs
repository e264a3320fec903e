//! IAM API: role assignments within an organization.

use reqwest::Method;
use serde_json::Value;

use super::{Client, Error, Result, UNAUTHORIZED};
use crate::{
    auth::TokenProvider,
    core::{check_id, IdRef},
    retry::RetryError,
};

pub struct IamApi<AuthTokenProvider> {
    pub client: Client<AuthTokenProvider>,
}

fn assignments_path(organization: &IdRef, assignment: Option<&IdRef>) -> Result<String, Error> {
    let collection = format!("/organizations/{}/role-assignments", check_id(organization)?);
    match assignment {
        Some(assignment) => Ok(format!("{}/{}", collection, check_id(assignment)?)),
        None => Ok(collection),
    }
}

impl<AuthTokenProvider> IamApi<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider,
{
    pub async fn list_role_assignments(&self, organization: &IdRef) -> Result<Vec<Value>> {
        let path = assignments_path(organization, None).map_err(RetryError::Call)?;
        self.client
            .call(Method::GET, &path, None, UNAUTHORIZED, None)
            .await
    }

    pub async fn assign_role(&self, organization: &IdRef, assignment: &Value) -> Result<Value> {
        let path = assignments_path(organization, None).map_err(RetryError::Call)?;
        self.client
            .call(Method::POST, &path, Some(assignment), UNAUTHORIZED, None)
            .await
    }

    pub async fn revoke_role(&self, organization: &IdRef, assignment: &IdRef) -> Result<()> {
        let path = assignments_path(organization, Some(assignment)).map_err(RetryError::Call)?;
        self.client
            .call_discarding(Method::DELETE, &path, UNAUTHORIZED, None)
            .await
    }
}

#[async_trait::async_trait]
impl<AuthTokenProvider> crate::core::Iam for IamApi<AuthTokenProvider>
where
    AuthTokenProvider: TokenProvider + 'static,
{
    async fn list_role_assignments(
        &self,
        organization: &IdRef,
    ) -> Result<Vec<Value>, anyhow::Error> {
        Ok(self.list_role_assignments(organization).await?)
    }

    async fn assign_role(
        &self,
        organization: &IdRef,
        assignment: Value,
    ) -> Result<Value, anyhow::Error> {
        Ok(self.assign_role(organization, &assignment).await?)
    }

    async fn revoke_role(
        &self,
        organization: &IdRef,
        assignment: &IdRef,
    ) -> Result<(), anyhow::Error> {
        self.revoke_role(organization, assignment).await?;
        Ok(())
    }
}
