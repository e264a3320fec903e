use std::sync::Arc;

use anyhow::Context;
use axum::{Router, Server};
use console_gateway::{
    api::http::{axum as console_axum, graphql},
    auth::{identity::IdentityClient, session::Session, StaticToken, TokenProvider},
    backend::{
        iam::IamApi, resources::ResourceApi, runner::RunnerApi, secrets::SecretsApi, Client,
    },
    config::{self, Config},
    core::Core,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("Invalid configuration")?;

    let reqwest_client = reqwest::Client::builder()
        .connection_verbose(true)
        .build()
        .context("Unable to build the HTTP client")?;

    let core = match config.auth.clone() {
        config::Auth::Static { access_token } => {
            info!(message = "Using a static access token");
            build_core(&config, reqwest_client, StaticToken::new(access_token))
        }
        config::Auth::Identity {
            token_url,
            client_id,
            client_secret,
            refresh_token,
            scopes,
            expiry_skew,
        } => {
            info!(message = "Using the identity provider", token_url = %token_url);
            let identity = IdentityClient {
                client: reqwest_client.clone(),
                token_url,
                client_id,
                client_secret,
                scopes,
            };
            let mut session = Session::new(identity).with_expiry_skew(expiry_skew);
            if let Some(refresh_token) = refresh_token {
                session = session.with_refresh_token(refresh_token);
            }
            build_core(&config, reqwest_client, session)
        }
    };

    let schema = graphql::schema().data(Arc::new(core)).finish();

    let app = console_axum::routes(Router::new(), schema);

    info!("Playground: http://{}", config.listen_addr);

    Server::bind(&config.listen_addr)
        .serve(app.into_make_service())
        .await
        .context("Server failed")?;

    Ok(())
}

/// Wire every backend to one shared token provider.
fn build_core<P>(config: &Config, client: reqwest::Client, provider: P) -> Core
where
    P: TokenProvider + 'static,
{
    let provider = Arc::new(provider);
    let client_for = |base_url: &str| Client::new(client.clone(), base_url, Arc::clone(&provider));

    Core {
        resources: Box::new(ResourceApi {
            client: client_for(&config.core_api_url),
        }),
        runs: Box::new(RunnerApi {
            client: client_for(&config.runner_api_url),
        }),
        secrets: Box::new(SecretsApi {
            client: client_for(&config.secrets_api_url),
        }),
        iam: Box::new(IamApi {
            client: client_for(&config.iam_api_url),
        }),
    }
}
