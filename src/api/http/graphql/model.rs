use async_graphql::{Context, Enum, Json, Object, Result, ID};
use serde_json::Value;

use super::{
    error,
    util::{load_core, to_graphql_error},
};

#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq)]
#[graphql(remote = "crate::core::ResourceKind")]
pub enum ResourceKind {
    Organization,
    Project,
    Module,
    Repository,
    Deployment,
    Run,
}

fn as_id(id: &Option<ID>) -> Option<&str> {
    id.as_ref().map(|id| id.as_str())
}

fn to_json(values: Vec<Value>) -> Vec<Json<Value>> {
    values.into_iter().map(Json).collect()
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Resources of one kind. Every kind but organizations needs the
    /// owning organization.
    async fn resources(
        &self,
        ctx: &Context<'_>,
        kind: ResourceKind,
        organization: Option<ID>,
    ) -> Result<Vec<Json<Value>>> {
        let core = load_core(ctx);
        let resources = core
            .resources
            .list(kind.into(), as_id(&organization))
            .await
            .map_err(to_graphql_error)?;
        Ok(to_json(resources))
    }

    async fn resource(
        &self,
        ctx: &Context<'_>,
        kind: ResourceKind,
        organization: Option<ID>,
        id: ID,
    ) -> Result<Option<Json<Value>>> {
        let core = load_core(ctx);
        let resource = core
            .resources
            .get(kind.into(), as_id(&organization), &id)
            .await
            .map_err(to_graphql_error)?;
        Ok(resource.map(Json))
    }

    async fn run_logs(&self, ctx: &Context<'_>, organization: ID, run: ID) -> Result<Json<Value>> {
        let core = load_core(ctx);
        let logs = core
            .runs
            .run_logs(&organization, &run)
            .await
            .map_err(to_graphql_error)?;
        Ok(Json(logs))
    }

    /// Secrets of an organization, as the secrets service describes them.
    async fn secrets(&self, ctx: &Context<'_>, organization: ID) -> Result<Vec<Json<Value>>> {
        let core = load_core(ctx);
        let secrets = core
            .secrets
            .list(&organization)
            .await
            .map_err(to_graphql_error)?;
        Ok(to_json(secrets))
    }

    async fn role_assignments(
        &self,
        ctx: &Context<'_>,
        organization: ID,
    ) -> Result<Vec<Json<Value>>> {
        let core = load_core(ctx);
        let assignments = core
            .iam
            .list_role_assignments(&organization)
            .await
            .map_err(to_graphql_error)?;
        Ok(to_json(assignments))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_resource(
        &self,
        ctx: &Context<'_>,
        kind: ResourceKind,
        organization: Option<ID>,
        payload: Json<Value>,
    ) -> Result<Json<Value>> {
        let core = load_core(ctx);
        let created = core
            .resources
            .create(kind.into(), as_id(&organization), payload.0)
            .await
            .map_err(to_graphql_error)?;
        Ok(Json(created))
    }

    /// Replace a resource. Fails with "Unknown resource" when it is gone.
    async fn update_resource(
        &self,
        ctx: &Context<'_>,
        kind: ResourceKind,
        organization: Option<ID>,
        id: ID,
        payload: Json<Value>,
    ) -> Result<Json<Value>> {
        let core = load_core(ctx);
        let organization = as_id(&organization);

        core.resources
            .get(kind.into(), organization, &id)
            .await
            .map_err(to_graphql_error)?
            .ok_or(error::UnknownResource)?;

        let updated = core
            .resources
            .update(kind.into(), organization, &id, payload.0)
            .await
            .map_err(to_graphql_error)?;
        Ok(Json(updated))
    }

    async fn delete_resource(
        &self,
        ctx: &Context<'_>,
        kind: ResourceKind,
        organization: Option<ID>,
        id: ID,
    ) -> Result<bool> {
        let core = load_core(ctx);
        core.resources
            .delete(kind.into(), as_id(&organization), &id)
            .await
            .map_err(to_graphql_error)?;
        Ok(true)
    }

    async fn put_secret(
        &self,
        ctx: &Context<'_>,
        organization: ID,
        name: ID,
        value: Json<Value>,
    ) -> Result<Json<Value>> {
        let core = load_core(ctx);
        let secret = core
            .secrets
            .put(&organization, &name, value.0)
            .await
            .map_err(to_graphql_error)?;
        Ok(Json(secret))
    }

    async fn delete_secret(&self, ctx: &Context<'_>, organization: ID, name: ID) -> Result<bool> {
        let core = load_core(ctx);
        core.secrets
            .delete(&organization, &name)
            .await
            .map_err(to_graphql_error)?;
        Ok(true)
    }

    async fn assign_role(
        &self,
        ctx: &Context<'_>,
        organization: ID,
        assignment: Json<Value>,
    ) -> Result<Json<Value>> {
        let core = load_core(ctx);
        let assignment = core
            .iam
            .assign_role(&organization, assignment.0)
            .await
            .map_err(to_graphql_error)?;
        Ok(Json(assignment))
    }

    async fn revoke_role(&self, ctx: &Context<'_>, organization: ID, assignment: ID) -> Result<bool> {
        let core = load_core(ctx);
        core.iam
            .revoke_role(&organization, &assignment)
            .await
            .map_err(to_graphql_error)?;
        Ok(true)
    }
}
