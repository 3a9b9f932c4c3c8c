//! Client configuration for Dify apps.
//!
//! Kubeconfig-style YAML with:
//! - Named connection contexts (host, app secret source, end user)
//! - `current-context` for default selection
//! - Defaults for timeouts and the end-user identity

pub mod client;
pub mod error;

pub use client::{
    client_config_path, config_dir, load_client_config, load_client_config_from,
    save_client_config, save_client_config_to, AuthConfig, ClientConfig, ClientDefaults, Context,
    ResolvedContext,
};
pub use error::{ConfigError, Result};
