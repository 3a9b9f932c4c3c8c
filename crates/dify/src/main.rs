//! dify - command-line client for Dify chat and workflow apps.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{chat, config, conversations, messages, parameters, run};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Command-line client for Dify chat and workflow apps
#[derive(Parser)]
#[command(name = "dify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Service host, overriding the context's (e.g. https://api.dify.ai)
    #[arg(long, global = true, env = "DIFY_HOST")]
    pub host: Option<String>,

    /// App API key, overriding the context's
    #[arg(long, global = true, env = "DIFY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Named context from the client config
    #[arg(long, global = true)]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a chat message and stream the answer
    Chat(chat::ChatArgs),

    /// Run a workflow and stream its progress
    Run(run::RunArgs),

    /// Message history and feedback
    Messages(messages::MessagesArgs),

    /// List and rename conversations
    Conversations(conversations::ConversationsArgs),

    /// Show the app's input form and features
    Parameters(parameters::ParametersArgs),

    /// Manage connection contexts
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "dify=debug,dify_client=debug,dify_config=debug,info"
    } else {
        "dify=info,dify_client=warn,warn"
    };

    let log_dir = dify_config::config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "dify.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "dify=trace,dify_client=trace,dify_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        host: cli.host,
        api_key: cli.api_key,
        context_name: cli.context,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Chat(args) => chat::run(args, &ctx).await,
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Messages(args) => messages::run(args, &ctx).await,
        Commands::Conversations(args) => conversations::run(args, &ctx).await,
        Commands::Parameters(args) => parameters::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
