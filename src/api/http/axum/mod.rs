use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract,
    response::{self, IntoResponse},
    routing::get,
    AddExtensionLayer, Router,
};

use super::graphql::Schema;

async fn graphql_handler(
    schema: extract::Extension<Schema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn playground() -> impl IntoResponse {
    response::Html(playground_source(
        GraphQLPlaygroundConfig::new("/").with_setting("request.credentials", "include"),
    ))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Mount the console GraphQL endpoint and its playground on `/`.
pub fn routes(router: Router, schema: Schema) -> Router {
    router
        .route("/", get(playground).post(graphql_handler))
        .route("/healthz", get(healthz))
        .layer(AddExtensionLayer::new(schema))
}
