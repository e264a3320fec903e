use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions};

use crate::{backend, core::Core, retry::RetryError};

pub fn load_core<'a>(ctx: &'a Context<'_>) -> &'a Arc<Core> {
    ctx.data_unchecked::<Arc<Core>>()
}

fn is_auth_failure(err: &anyhow::Error) -> bool {
    err.downcast_ref::<RetryError<backend::Error>>()
        .map_or(false, RetryError::is_auth_failure)
}

/// Tag errors that mean "sign in again" so the console can redirect.
pub fn to_graphql_error(err: anyhow::Error) -> async_graphql::Error {
    let gql_err = async_graphql::Error::new(format!("{:#}", err));
    if is_auth_failure(&err) {
        return gql_err.extend_with(|_, e| e.set("code", "UNAUTHENTICATED"));
    }
    gql_err
}
