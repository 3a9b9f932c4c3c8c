//! Conversations command.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};

use dify_client::{ListConversationsQuery, RenameConversationRequest};

use super::Context;

/// Arguments for the conversations command.
#[derive(Args, Debug)]
pub struct ConversationsArgs {
    #[command(subcommand)]
    pub command: ConversationsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConversationsCommand {
    /// List conversations, most recent first
    List {
        /// Page size
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Show the page after this conversation ID
        #[arg(long)]
        last_id: Option<String>,

        /// End-user identity (default: from the context)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Rename a conversation
    Rename {
        /// Conversation ID
        id: String,

        /// New name
        name: String,

        /// End-user identity (default: from the context)
        #[arg(short, long)]
        user: Option<String>,
    },
}

/// Run the conversations command.
pub async fn run(args: ConversationsArgs, ctx: &Context) -> Result<()> {
    let dim = Style::new().dim();

    match args.command {
        ConversationsCommand::List {
            limit,
            last_id,
            user,
        } => {
            let conn = ctx.connect(user.as_deref())?;
            let mut query = ListConversationsQuery::new(conn.user);
            query.limit = limit;
            query.last_id = last_id;

            let page = conn.client.conversations().list(query).await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&page)?);
                return Ok(());
            }

            println!("{}", style("Conversations").bold());
            println!("{}", dim.apply_to("─".repeat(50)));

            if page.data.is_empty() {
                println!("{}", dim.apply_to("No conversations found"));
                return Ok(());
            }

            for conversation in &page.data {
                let when = chrono::DateTime::from_timestamp(conversation.created_at, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {}  {}",
                    dim.apply_to(&conversation.id),
                    conversation.name,
                    dim.apply_to(when)
                );
            }
            if page.has_more
                && let Some(last) = page.data.last()
            {
                println!();
                println!(
                    "{}",
                    dim.apply_to(format!("... more available (--last-id {})", last.id))
                );
            }
        }
        ConversationsCommand::Rename { id, name, user } => {
            let conn = ctx.connect(user.as_deref())?;
            let request = RenameConversationRequest {
                name: name.clone(),
                user: conn.user,
            };

            let response = conn.client.conversations().rename(&id, request).await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                let green = Style::new().green();
                println!(
                    "{} Conversation {} renamed to \"{}\"",
                    green.apply_to("✓"),
                    dim.apply_to(&id),
                    name
                );
            }
        }
    }

    Ok(())
}
