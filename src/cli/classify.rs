use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::context::CliContext;
use super::output::print_json;

#[derive(Args, Clone, Debug)]
pub struct ClassifyArgs {
    /// Error message; multiple words are joined with spaces
    #[arg(required = true, value_name = "MESSAGE")]
    pub message: Vec<String>,
}

pub fn cmd_classify(args: ClassifyArgs, ctx: &CliContext) -> Result<()> {
    let message = args.message.join(" ");
    let reason = action_flow::classify_failure(&message);
    if ctx.json() {
        print_json(&json!({ "message": message, "reason": reason }))?;
    } else {
        println!("{}", reason);
    }
    Ok(())
}
