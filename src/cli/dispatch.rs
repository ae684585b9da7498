use super::classify::cmd_classify;
use super::env::CliArgs;
use super::memory::cmd_memory;
use super::rules::cmd_rules;
use super::run::cmd_run;
use super::strategies::cmd_strategies;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Rules(args) => cmd_rules(args, ctx),
        Commands::Memory(args) => cmd_memory(args, ctx),
        Commands::Strategies(args) => cmd_strategies(args, ctx),
        Commands::Classify(args) => cmd_classify(args, ctx),
    }
}
