//! Parameters command - show the app's input form.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;

/// Arguments for the parameters command.
#[derive(Args, Debug)]
pub struct ParametersArgs {
    /// End-user identity (default: from the context)
    #[arg(short, long)]
    pub user: Option<String>,
}

/// Run the parameters command.
pub async fn run(args: ParametersArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.connect(args.user.as_deref())?;
    let params = conn.client.parameters().get(&conn.user).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }

    let dim = Style::new().dim();

    println!("{}", style("App Parameters").bold());
    println!("{}", dim.apply_to("─".repeat(50)));

    if !params.opening_statement.is_empty() {
        println!("Opening statement: {}", params.opening_statement);
    }
    for question in &params.suggested_questions {
        match question.as_str() {
            Some(q) => println!("  ? {}", q),
            None => println!("  ? {}", question),
        }
    }
    println!(
        "Follow-up suggestions: {}",
        on_off(params.suggested_questions_after_answer.enabled)
    );
    println!("More like this: {}", on_off(params.more_like_this.enabled));

    if params.user_input_form.is_empty() {
        println!("{}", dim.apply_to("No input variables"));
        return Ok(());
    }

    println!();
    println!("{}", style("Inputs").bold());
    for control in &params.user_input_form {
        // Each entry is a single-key map: {"text-input": {...}}
        for (kind, field) in control {
            let variable = field.get("variable").and_then(|v| v.as_str()).unwrap_or("?");
            let label = field.get("label").and_then(|v| v.as_str()).unwrap_or("");
            let required = field
                .get("required")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            println!(
                "  {:<20} {:<12} {}{}",
                variable,
                dim.apply_to(kind),
                label,
                if required { " (required)" } else { "" }
            );
        }
    }

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
