//! Chat command - send a message and stream the answer.

use anyhow::Result;
use clap::Args;
use console::Style;
use futures::StreamExt;
use std::io::Write;

use dify_client::{ChatEventKind, ChatMessageRequest};

use super::{Context, cancel_on_ctrl_c, inputs_map, parse_input};

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// The message to send
    #[arg(required = true)]
    pub query: String,

    /// Continue an existing conversation
    #[arg(short, long)]
    pub conversation: Option<String>,

    /// End-user identity (default: from the context)
    #[arg(short, long)]
    pub user: Option<String>,

    /// App input variable as key=value (repeatable)
    #[arg(short, long = "input", value_parser = parse_input)]
    pub inputs: Vec<(String, String)>,

    /// Wait for the full answer instead of streaming
    #[arg(long)]
    pub blocking: bool,
}

/// Run the chat command.
pub async fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.connect(args.user.as_deref())?;
    let dim = Style::new().dim();

    let mut request = ChatMessageRequest::new(args.query, conn.user.clone());
    request.inputs = inputs_map(args.inputs);
    request.conversation_id = args.conversation;

    if ctx.verbose {
        eprintln!(
            "{}",
            dim.apply_to(format!(
                "Sending to: {} as {}",
                conn.client.base_url(),
                conn.user
            ))
        );
    }

    if args.blocking {
        let response = conn.client.chat().send(request).await?;
        if ctx.json_output {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            println!("{}", response.answer);
            eprintln!(
                "{}",
                dim.apply_to(format!("conversation: {}", response.conversation_id))
            );
        }
        return Ok(());
    }

    let cancel = cancel_on_ctrl_c();
    let mut events = conn.client.chat().stream_with_cancel(request, &cancel).await?;

    let mut has_output = false;
    let mut conversation_id = None;

    while let Some(outcome) = events.next().await {
        let event = match outcome {
            Ok(event) => event,
            Err(e) => {
                if has_output {
                    println!();
                }
                let red = Style::new().red();
                eprintln!("{} {}", red.apply_to("Error:"), e);
                return Err(e.into());
            }
        };

        if event.conversation_id.is_some() {
            conversation_id = event.conversation_id.clone();
        }

        if ctx.json_output {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }

        match &event.kind {
            ChatEventKind::Message { answer } | ChatEventKind::AgentMessage { answer } => {
                print!("{}", answer);
                std::io::stdout().flush()?;
                has_output = true;
            }
            ChatEventKind::MessageReplace { answer } => {
                if has_output {
                    println!();
                }
                println!("{}", answer);
                has_output = false;
            }
            ChatEventKind::AgentThought(thought) if !thought.tool.is_empty() => {
                if has_output {
                    println!();
                }
                eprintln!("{}", dim.apply_to(format!("[Using: {}]", thought.tool)));
                has_output = false;
            }
            ChatEventKind::MessageFile(file) => {
                eprintln!("{}", dim.apply_to(format!("[{}: {}]", file.file_type, file.url)));
            }
            _ => {}
        }
    }

    if has_output {
        println!();
    }
    if events.is_cancelled() {
        eprintln!("{}", dim.apply_to("[cancelled]"));
    } else if let Some(id) = conversation_id.filter(|_| !ctx.json_output) {
        eprintln!("{}", dim.apply_to(format!("conversation: {}", id)));
    }

    Ok(())
}
