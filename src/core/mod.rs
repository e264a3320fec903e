use serde_json::Value;

pub type IdRef = str;

/// Everything the console API layer talks to.
pub struct Core {
    pub resources: Box<dyn Resources>,
    pub runs: Box<dyn RunLogs>,
    pub secrets: Box<dyn Secrets>,
    pub iam: Box<dyn Iam>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Organization,
    Project,
    Module,
    Repository,
    Deployment,
    Run,
}

impl ResourceKind {
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Organization => "organizations",
            ResourceKind::Project => "projects",
            ResourceKind::Module => "modules",
            ResourceKind::Repository => "repositories",
            ResourceKind::Deployment => "deployments",
            ResourceKind::Run => "runs",
        }
    }

    /// Organizations are top level, everything else lives inside one.
    pub fn is_scoped(&self) -> bool {
        !matches!(self, ResourceKind::Organization)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unable to parse the ID")]
pub struct IdParsingError;

#[derive(Debug, thiserror::Error)]
#[error("An organization is required for {0:?} resources")]
pub struct MissingOrganization(pub ResourceKind);

/// IDs end up as URL path segments, so dot segments are refused too.
pub fn check_id(id: &IdRef) -> Result<&IdRef, IdParsingError> {
    if matches!(id, "" | "." | "..")
        || id.contains(|c: char| matches!(c, '/' | '\\' | '?' | '#' | '%'))
    {
        return Err(IdParsingError);
    }
    Ok(id)
}

#[async_trait::async_trait]
pub trait Resources: Send + Sync {
    async fn list(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
    ) -> Result<Vec<Value>, anyhow::Error>;
    async fn get(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
    ) -> Result<Option<Value>, anyhow::Error>;

    async fn create(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        payload: Value,
    ) -> Result<Value, anyhow::Error>;
    async fn update(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
        payload: Value,
    ) -> Result<Value, anyhow::Error>;
    async fn delete(
        &self,
        kind: ResourceKind,
        organization: Option<&IdRef>,
        id: &IdRef,
    ) -> Result<(), anyhow::Error>;
}

#[async_trait::async_trait]
pub trait RunLogs: Send + Sync {
    async fn run_logs(&self, organization: &IdRef, run: &IdRef) -> Result<Value, anyhow::Error>;
}

#[async_trait::async_trait]
pub trait Secrets: Send + Sync {
    async fn list(&self, organization: &IdRef) -> Result<Vec<Value>, anyhow::Error>;
    async fn put(
        &self,
        organization: &IdRef,
        name: &IdRef,
        value: Value,
    ) -> Result<Value, anyhow::Error>;
    async fn delete(&self, organization: &IdRef, name: &IdRef) -> Result<(), anyhow::Error>;
}

#[async_trait::async_trait]
pub trait Iam: Send + Sync {
    async fn list_role_assignments(&self, organization: &IdRef)
        -> Result<Vec<Value>, anyhow::Error>;
    async fn assign_role(
        &self,
        organization: &IdRef,
        assignment: Value,
    ) -> Result<Value, anyhow::Error>;
    async fn revoke_role(&self, organization: &IdRef, assignment: &IdRef)
        -> Result<(), anyhow::Error>;
}
