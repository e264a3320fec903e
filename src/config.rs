//! Start-up configuration, read from `CONSOLE_*` environment variables.

use std::{net::SocketAddr, time::Duration};

use crate::auth::session::DEFAULT_EXPIRY_SKEW;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
const MAX_TOKEN_SKEW_SECS: u64 = 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("env var {0} is not set")]
    Missing(&'static str),
    #[error("env var {key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub core_api_url: String,
    pub runner_api_url: String,
    pub secrets_api_url: String,
    pub iam_api_url: String,
    pub auth: Auth,
}

#[derive(Debug, Clone)]
pub enum Auth {
    /// A long-lived token, mostly for development.
    Static { access_token: String },
    Identity {
        token_url: String,
        client_id: String,
        client_secret: Option<String>,
        refresh_token: Option<String>,
        scopes: Vec<String>,
        expiry_skew: Duration,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source; empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let require = |key: &'static str| get(key).ok_or(Error::Missing(key));

        let listen_addr = get("CONSOLE_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into());
        let listen_addr = listen_addr.parse().map_err(|err: std::net::AddrParseError| Error::Invalid {
            key: "CONSOLE_LISTEN_ADDR",
            value: listen_addr.clone(),
            reason: err.to_string(),
        })?;

        let auth = match get("CONSOLE_STATIC_TOKEN") {
            Some(access_token) => Auth::Static { access_token },
            None => {
                let expiry_skew = match get("CONSOLE_TOKEN_SKEW_SECS") {
                    Some(value) => {
                        let secs = value.parse::<u64>().map_err(|err| Error::Invalid {
                            key: "CONSOLE_TOKEN_SKEW_SECS",
                            value: value.clone(),
                            reason: err.to_string(),
                        })?;
                        if secs > MAX_TOKEN_SKEW_SECS {
                            return Err(Error::Invalid {
                                key: "CONSOLE_TOKEN_SKEW_SECS",
                                value,
                                reason: format!("must be at most {} seconds", MAX_TOKEN_SKEW_SECS),
                            });
                        }
                        Duration::from_secs(secs)
                    }
                    None => DEFAULT_EXPIRY_SKEW,
                };
                let scopes = get("CONSOLE_SCOPES")
                    .map(|scopes| scopes.split_whitespace().map(str::to_owned).collect())
                    .unwrap_or_default();
                Auth::Identity {
                    token_url: require("CONSOLE_TOKEN_URL")?,
                    client_id: require("CONSOLE_CLIENT_ID")?,
                    client_secret: get("CONSOLE_CLIENT_SECRET"),
                    refresh_token: get("CONSOLE_REFRESH_TOKEN"),
                    scopes,
                    expiry_skew,
                }
            }
        };

        Ok(Self {
            listen_addr,
            core_api_url: require("CONSOLE_CORE_API_URL")?,
            runner_api_url: require("CONSOLE_RUNNER_API_URL")?,
            secrets_api_url: require("CONSOLE_SECRETS_API_URL")?,
            iam_api_url: require("CONSOLE_IAM_API_URL")?,
            auth,
        })
    }
}
