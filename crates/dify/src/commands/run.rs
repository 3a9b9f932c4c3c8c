//! Run command - execute a workflow and stream node progress.

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use futures::StreamExt;
use std::io::Write;

use dify_client::{RunStatus, WorkflowEventKind, WorkflowFinished, WorkflowRunRequest};

use super::{Context, cancel_on_ctrl_c, inputs_map, parse_input};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workflow input variable as key=value (repeatable)
    #[arg(short, long = "input", value_parser = parse_input)]
    pub inputs: Vec<(String, String)>,

    /// End-user identity (default: from the context)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Wait for the result instead of streaming progress
    #[arg(long)]
    pub blocking: bool,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.connect(args.user.as_deref())?;

    let mut request = WorkflowRunRequest::new(conn.user.clone());
    request.inputs = inputs_map(args.inputs);

    if args.blocking {
        let response = conn.client.workflows().run(request).await?;
        if ctx.json_output {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_finished(&response.data)?;
        }
        return finish(&response.data);
    }

    let cancel = cancel_on_ctrl_c();
    let mut events = conn
        .client
        .workflows()
        .stream_with_cancel(request, &cancel)
        .await?;

    let dim = Style::new().dim();
    let green = Style::new().green();
    let red = Style::new().red();
    let mut finished = None;
    let mut in_text = false;

    while let Some(outcome) = events.next().await {
        let event = match outcome {
            Ok(event) => event,
            Err(e) => {
                if in_text {
                    println!();
                }
                eprintln!("{} {}", red.apply_to("Error:"), e);
                return Err(e.into());
            }
        };

        if ctx.json_output {
            println!("{}", serde_json::to_string(&event)?);
            if let WorkflowEventKind::WorkflowFinished(data) = event.kind {
                finished = Some(data);
            }
            continue;
        }

        match event.kind {
            WorkflowEventKind::WorkflowStarted(data) => {
                eprintln!("{}", dim.apply_to(format!("Run {} started", data.id)));
            }
            WorkflowEventKind::NodeStarted(node) => {
                eprintln!("{} {}", dim.apply_to("▸"), node_label(&node.title, &node.node_type));
            }
            WorkflowEventKind::NodeFinished(node) => {
                let mark = match node.status {
                    RunStatus::Succeeded => green.apply_to("✓"),
                    RunStatus::Failed | RunStatus::Exception => red.apply_to("✗"),
                    _ => dim.apply_to("·"),
                };
                eprintln!(
                    "{} {} {}",
                    mark,
                    node_label(&node.title, &node.node_type),
                    dim.apply_to(format!("({}, {:.2}s)", node.status, node.elapsed_time))
                );
                if let Some(err) = node.error.filter(|e| !e.is_empty()) {
                    eprintln!("  {}", red.apply_to(err));
                }
            }
            WorkflowEventKind::TextChunk { text } => {
                print!("{}", text);
                std::io::stdout().flush()?;
                in_text = true;
            }
            WorkflowEventKind::WorkflowFinished(data) => {
                if in_text {
                    println!();
                    in_text = false;
                }
                print_finished(&data)?;
                finished = Some(data);
            }
            _ => {}
        }
    }

    if in_text {
        println!();
    }

    match finished {
        Some(data) => finish(&data),
        None if events.is_cancelled() => {
            eprintln!("{}", dim.apply_to("[cancelled]"));
            Ok(())
        }
        None => bail!("stream ended before the workflow finished"),
    }
}

fn node_label(title: &str, node_type: &str) -> String {
    if title.is_empty() {
        node_type.to_string()
    } else {
        title.to_string()
    }
}

fn print_finished(data: &WorkflowFinished) -> Result<()> {
    println!(
        "{} {} {}",
        style("Workflow").bold(),
        data.status,
        Style::new().dim().apply_to(format!(
            "({} steps, {} tokens, {:.2}s)",
            data.total_steps, data.total_tokens, data.elapsed_time
        ))
    );
    if let Some(outputs) = &data.outputs {
        println!("{}", serde_json::to_string_pretty(outputs)?);
    }
    Ok(())
}

/// Map a finished run to the command's exit status.
fn finish(data: &WorkflowFinished) -> Result<()> {
    match data.status {
        RunStatus::Failed | RunStatus::Exception => bail!(
            "workflow {}: {}",
            data.status,
            data.error.as_deref().unwrap_or("no error message")
        ),
        _ => Ok(()),
    }
}
