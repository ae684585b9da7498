use anyhow::{bail, Result};
use clap::{Args, Subcommand, ValueEnum};
use rule_engine::{Rule, RuleFeedback};

use super::context::CliContext;
use super::output::print_json;

#[derive(Args, Clone, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RulesCommand {
    /// List every rule with its weight and status
    List,
    /// Show one rule in full
    Show {
        #[arg(value_name = "RULE_ID")]
        id: String,
    },
    /// Re-enable a rule at the given weight
    Reset {
        #[arg(value_name = "RULE_ID")]
        id: String,
        #[arg(long, default_value_t = 0.5)]
        weight: f64,
    },
    /// Record a success or failure for a rule
    Feedback {
        #[arg(value_name = "RULE_ID")]
        id: String,
        #[arg(value_enum)]
        result: FeedbackArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FeedbackArg {
    Success,
    Failure,
}

impl From<FeedbackArg> for RuleFeedback {
    fn from(arg: FeedbackArg) -> Self {
        match arg {
            FeedbackArg::Success => RuleFeedback::Success,
            FeedbackArg::Failure => RuleFeedback::Failure,
        }
    }
}

pub fn cmd_rules(args: RulesArgs, ctx: &CliContext) -> Result<()> {
    let engine = ctx.open_engine()?;

    match args.command {
        RulesCommand::List => {
            let rules = engine.rules().rules();
            if ctx.json() {
                print_json(&rules)?;
            } else {
                print_rule_table(&rules);
            }
        }
        RulesCommand::Show { id } => {
            let Some(rule) = engine.rules().get(&id) else {
                bail!("No rule found for id {}", id);
            };
            if ctx.json() {
                print_json(&rule)?;
            } else {
                print!("{}", serde_yaml::to_string(&rule)?);
            }
        }
        RulesCommand::Reset { id, weight } => {
            let rule = engine.reset_rule(&id, weight)?;
            report_update(ctx, "Reset", &rule)?;
        }
        RulesCommand::Feedback { id, result } => {
            let rule = engine.update_rule_weight(&id, result.into())?;
            report_update(ctx, "Updated", &rule)?;
        }
    }

    Ok(())
}

fn report_update(ctx: &CliContext, verb: &str, rule: &Rule) -> Result<()> {
    if ctx.json() {
        return print_json(rule);
    }
    println!(
        "{} rule '{}' (weight={:.3}, confidence={:.3}, enabled={})",
        verb, rule.id, rule.weight, rule.confidence, rule.enabled
    );
    Ok(())
}

fn print_rule_table(rules: &[Rule]) {
    println!(
        "{:<28} {:<20} {:<28} {:>6} {:>6} {:<8} {}",
        "ID", "ON FAILURE", "ACTION", "WEIGHT", "CONF", "ENABLED", "STATUS"
    );
    for rule in rules {
        println!(
            "{:<28} {:<20} {:<28} {:>6.3} {:>6.3} {:<8} {}",
            rule.id,
            rule.on_failure,
            rule.learn.action.as_str(),
            rule.weight,
            rule.confidence,
            rule.enabled,
            rule.metadata.status.map(|status| status.as_str()).unwrap_or("-")
        );
    }
}
