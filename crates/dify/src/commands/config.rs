//! Config command - connection context management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;

use dify_config::{AuthConfig, ClientConfig, Context as ClientContext};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the client configuration
    Show,

    /// Show configuration file path
    Path,

    /// Show the current context name
    CurrentContext,

    /// List available contexts
    GetContexts,

    /// Switch to a different context
    UseContext {
        /// Context name to switch to
        name: String,
    },

    /// Create or update a context
    SetContext {
        /// Context name
        name: String,

        /// Service host (e.g., https://api.dify.ai)
        #[arg(long)]
        host: Option<String>,

        /// Environment variable holding the app API key
        #[arg(long, conflicts_with = "key_file")]
        key_env: Option<String>,

        /// File holding the app API key
        #[arg(long)]
        key_file: Option<PathBuf>,

        /// End-user identity for this context
        #[arg(long)]
        user: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Delete a context
    DeleteContext {
        /// Context name to delete
        name: String,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::CurrentContext => cmd_current_context(),
        ConfigCommand::GetContexts => cmd_get_contexts(ctx),
        ConfigCommand::UseContext { name } => cmd_use_context(&name),
        ConfigCommand::SetContext {
            name,
            host,
            key_env,
            key_file,
            user,
            timeout,
        } => {
            let auth = match (key_env, key_file) {
                (Some(var), _) => Some(AuthConfig::api_key_env(var)),
                (None, Some(path)) => Some(AuthConfig::api_key_file(path)),
                (None, None) => None,
            };
            cmd_set_context(&name, host, auth, user, timeout)
        }
        ConfigCommand::DeleteContext { name } => cmd_delete_context(&name),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = dify_config::load_client_config()?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = dify_config::client_config_path() {
        let dim = Style::new().dim();
        println!("{}", dim.apply_to(format!("# {}", path.display())));
    }
    print!("{}", config.to_yaml()?);

    if ctx.verbose
        && let Some(current) = config.current()
    {
        let key = match &current.auth {
            Some(auth) => match auth.resolve()? {
                Some(_) => "found",
                None => "missing",
            },
            None => "not configured",
        };
        println!();
        println!("API key for \"{}\": {}", current.name, key);
    }

    Ok(())
}

fn cmd_path() -> Result<()> {
    match dify_config::client_config_path() {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("Could not determine config directory"),
    }
    Ok(())
}

fn cmd_current_context() -> Result<()> {
    let config = dify_config::load_client_config()?;

    match &config.current_context {
        Some(name) => println!("{}", name),
        None => {
            println!("No current context set. Use 'dify config use-context <name>' to set one.")
        }
    }

    Ok(())
}

fn cmd_get_contexts(ctx: &Context) -> Result<()> {
    let config = dify_config::load_client_config()?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&config.contexts)?);
        return Ok(());
    }

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!();
        println!("Create one with:");
        println!("  dify config set-context cloud --host https://api.dify.ai --key-env DIFY_API_KEY");
        return Ok(());
    }

    let current = config.current_context.as_deref();

    println!("CURRENT   NAME            HOST");
    for context in &config.contexts {
        let marker = if current == Some(context.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{}         {:<15} {}", marker, context.name, context.host);
    }

    Ok(())
}

fn cmd_use_context(name: &str) -> Result<()> {
    let mut config = dify_config::load_client_config()?;

    config.use_context(name)?;
    dify_config::save_client_config(&config)?;

    println!("Switched to context \"{}\".", name);

    Ok(())
}

fn cmd_set_context(
    name: &str,
    host: Option<String>,
    auth: Option<AuthConfig>,
    user: Option<String>,
    timeout: Option<u64>,
) -> Result<()> {
    let mut config = dify_config::load_client_config()?;

    let created = apply_context(&mut config, name, host, auth, user, timeout)?;
    if created {
        println!("Context \"{}\" created.", name);
    } else {
        println!("Context \"{}\" modified.", name);
    }

    // The first context becomes current.
    if config.current_context.is_none() && config.contexts.len() == 1 {
        config.use_context(name)?;
        println!("Context \"{}\" set as current context.", name);
    }

    dify_config::save_client_config(&config)?;

    Ok(())
}

/// Create or update a context; returns whether it was created.
fn apply_context(
    config: &mut ClientConfig,
    name: &str,
    host: Option<String>,
    auth: Option<AuthConfig>,
    user: Option<String>,
    timeout: Option<u64>,
) -> Result<bool> {
    match config.get_context_mut(name) {
        Some(existing) => {
            if let Some(host) = host {
                existing.host = host;
            }
            if auth.is_some() {
                existing.auth = auth;
            }
            if user.is_some() {
                existing.user = user;
            }
            if timeout.is_some() {
                existing.timeout = timeout;
            }
            Ok(false)
        }
        None => {
            let host = host
                .ok_or_else(|| anyhow::anyhow!("--host is required when creating a new context"))?;
            let mut context = ClientContext::new(name, host);
            context.auth = auth;
            context.user = user;
            context.timeout = timeout;
            config.set_context(context);
            Ok(true)
        }
    }
}

fn cmd_delete_context(name: &str) -> Result<()> {
    let mut config = dify_config::load_client_config()?;

    match config.remove_context(name) {
        Some(_) => {
            dify_config::save_client_config(&config)?;
            println!("Context \"{}\" deleted.", name);
            if config.current_context.is_none() {
                println!(
                    "Note: No current context. Use 'dify config use-context <name>' to set one."
                );
            }
        }
        None => {
            anyhow::bail!("context \"{}\" not found", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_context_creates_and_updates() {
        let mut config = ClientConfig::new();

        let created = apply_context(
            &mut config,
            "cloud",
            Some("https://api.dify.ai".into()),
            Some(AuthConfig::api_key_env("DIFY_API_KEY")),
            None,
            None,
        )
        .unwrap();
        assert!(created);

        let created =
            apply_context(&mut config, "cloud", None, None, Some("me".into()), Some(5)).unwrap();
        assert!(!created);

        let cloud = config.get_context("cloud").unwrap();
        assert_eq!(cloud.host, "https://api.dify.ai");
        assert_eq!(cloud.auth, Some(AuthConfig::api_key_env("DIFY_API_KEY")));
        assert_eq!(cloud.user.as_deref(), Some("me"));
        assert_eq!(cloud.timeout, Some(5));
    }

    #[test]
    fn test_apply_context_requires_host_for_new() {
        let mut config = ClientConfig::new();
        assert!(apply_context(&mut config, "x", None, None, None, None).is_err());
        assert!(config.contexts.is_empty());
    }
}
