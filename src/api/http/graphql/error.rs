#[derive(Debug, thiserror::Error)]
#[error("Unknown resource")]
pub struct UnknownResource;
