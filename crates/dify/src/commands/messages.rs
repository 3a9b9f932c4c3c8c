//! Messages command - conversation history and feedback.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};

use dify_client::{ListMessagesQuery, MessageFeedbackRequest, Rating};

use super::Context;

/// Arguments for the messages command.
#[derive(Args, Debug)]
pub struct MessagesArgs {
    #[command(subcommand)]
    pub command: MessagesCommand,
}

#[derive(Subcommand, Debug)]
pub enum MessagesCommand {
    /// List a conversation's messages
    List {
        /// Conversation ID
        #[arg(short, long)]
        conversation: String,

        /// Show the page before this message ID
        #[arg(long)]
        first_id: Option<String>,

        /// Page size
        #[arg(short, long)]
        limit: Option<u32>,

        /// End-user identity (default: from the context)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Rate a message (omit --rating to revoke)
    Feedback {
        /// Message ID
        id: String,

        /// like or dislike
        #[arg(short, long)]
        rating: Option<Rating>,

        /// End-user identity (default: from the context)
        #[arg(short, long)]
        user: Option<String>,
    },
}

/// Run the messages command.
pub async fn run(args: MessagesArgs, ctx: &Context) -> Result<()> {
    let dim = Style::new().dim();

    match args.command {
        MessagesCommand::List {
            conversation,
            first_id,
            limit,
            user,
        } => {
            let conn = ctx.connect(user.as_deref())?;
            let mut query = ListMessagesQuery::new(conversation, conn.user);
            query.first_id = first_id;
            query.limit = limit;

            let page = conn.client.messages().list(query).await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&page)?);
                return Ok(());
            }

            if page.data.is_empty() {
                println!("{}", dim.apply_to("No messages found"));
                return Ok(());
            }

            // Newest first on the wire; print in reading order.
            for message in page.data.iter().rev() {
                println!("{} {}", style("User:").bold(), message.query);
                println!("{} {}", style("App:").bold(), message.answer);
                println!("{}", dim.apply_to(format!("[{}]", message.id)));
                println!();
            }
            if page.has_more {
                println!("{}", dim.apply_to("... more messages available (use --first-id)"));
            }
        }
        MessagesCommand::Feedback { id, rating, user } => {
            let conn = ctx.connect(user.as_deref())?;
            let request = MessageFeedbackRequest {
                rating,
                user: conn.user,
            };

            let response = conn.client.messages().feedback(&id, request).await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                let green = Style::new().green();
                let action = match rating {
                    Some(Rating::Like) => "liked",
                    Some(Rating::Dislike) => "disliked",
                    None => "rating revoked",
                };
                println!("{} Message {}: {}", green.apply_to("✓"), dim.apply_to(&id), action);
            }
        }
    }

    Ok(())
}
