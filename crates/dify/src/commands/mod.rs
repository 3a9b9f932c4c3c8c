//! CLI command handlers.

pub mod chat;
pub mod config;
pub mod conversations;
pub mod messages;
pub mod parameters;
pub mod run;

use std::collections::HashMap;

use anyhow::{Result, bail};
use dify_client::{CancellationToken, DifyClient};
use dify_config::ConfigError;
use serde_json::Value;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Host from `--host` / `DIFY_HOST`.
    pub host: Option<String>,
    /// App key from `--api-key` / `DIFY_API_KEY`.
    pub api_key: Option<String>,
    /// Context selected with `--context`.
    pub context_name: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

/// A ready client plus the end user to act as.
pub struct Connection {
    pub client: DifyClient,
    pub user: String,
}

impl Context {
    /// Build a client from the flags, falling back to the client config.
    pub fn connect(&self, user_override: Option<&str>) -> Result<Connection> {
        let config = dify_config::load_client_config()?;
        let resolved = match config.resolve(self.context_name.as_deref()) {
            Ok(resolved) => Some(resolved),
            Err(ConfigError::NoCurrentContext) => None,
            Err(e) => return Err(e.into()),
        };

        let Some(host) = self
            .host
            .clone()
            .or_else(|| resolved.as_ref().map(|r| r.host.clone()))
        else {
            bail!("no host configured; pass --host or run `dify config set-context <name> --host <url>`");
        };
        let Some(api_key) = self
            .api_key
            .clone()
            .or_else(|| resolved.as_ref().and_then(|r| r.api_key.clone()))
        else {
            bail!("no API key found; pass --api-key, set DIFY_API_KEY or configure the context's auth");
        };

        let user = user_override
            .map(str::to_string)
            .or_else(|| resolved.as_ref().map(|r| r.user.clone()))
            .unwrap_or_else(|| config.defaults.user.clone());

        let mut builder = DifyClient::builder().host(&host).api_secret(api_key);
        match &resolved {
            Some(resolved) => {
                builder = builder
                    .timeout(resolved.timeout)
                    .stream_timeout(resolved.stream_timeout);
            }
            None => {
                builder = builder
                    .timeout(std::time::Duration::from_secs(config.defaults.timeout))
                    .stream_timeout(std::time::Duration::from_secs(
                        config.defaults.stream_timeout,
                    ));
            }
        }

        tracing::debug!(%host, %user, context = ?resolved.as_ref().map(|r| &r.name), "connecting");
        Ok(Connection {
            client: builder.build()?,
            user,
        })
    }
}

/// A token cancelled by the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    token
}

/// Parse a `key=value` input argument.
pub fn parse_input(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid input '{}', expected key=value", s)),
    }
}

/// Collect parsed `--input` pairs into an inputs map.
pub fn inputs_map(pairs: Vec<(String, String)>) -> HashMap<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect()
}
