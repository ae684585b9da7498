use anyhow::{bail, Result};
use action_locator::{element_from_selector, generate_strategies, ElementInfo, SelectorStrategy};
use clap::Args;

use super::context::CliContext;
use super::output::print_json;

#[derive(Args, Clone, Debug)]
pub struct StrategiesArgs {
    /// Reverse-parse an existing selector instead of describing the element
    #[arg(long, conflicts_with_all = ["test_id", "data_test", "id", "class", "tag", "role", "aria_label", "text", "path"])]
    pub selector: Option<String>,

    #[arg(long)]
    pub test_id: Option<String>,

    #[arg(long)]
    pub data_test: Option<String>,

    #[arg(long)]
    pub id: Option<String>,

    /// Class name; repeatable
    #[arg(long)]
    pub class: Vec<String>,

    #[arg(long)]
    pub tag: Option<String>,

    #[arg(long)]
    pub role: Option<String>,

    #[arg(long)]
    pub aria_label: Option<String>,

    #[arg(long)]
    pub text: Option<String>,

    /// Structural CSS or XPath path
    #[arg(long)]
    pub path: Option<String>,
}

impl StrategiesArgs {
    fn element(&self) -> ElementInfo {
        if let Some(selector) = self.selector.as_deref() {
            return element_from_selector(selector);
        }
        ElementInfo {
            test_id: self.test_id.clone(),
            data_test: self.data_test.clone(),
            id: self.id.clone(),
            class_names: self.class.clone(),
            tag_name: self.tag.clone(),
            role: self.role.clone(),
            aria_label: self.aria_label.clone(),
            text: self.text.clone(),
            path: self.path.clone(),
        }
    }
}

pub fn cmd_strategies(args: StrategiesArgs, ctx: &CliContext) -> Result<()> {
    let element = args.element();
    if element.is_empty() {
        bail!("Describe the element with --selector or at least one attribute flag");
    }
    let strategies = generate_strategies(&element);
    if ctx.json() {
        print_json(&strategies)?;
    } else {
        print_strategy_table(&strategies);
    }
    Ok(())
}

fn print_strategy_table(strategies: &[SelectorStrategy]) {
    println!("{:<8} {:>5} {:<40} {}", "KIND", "CONF", "SELECTOR", "DESCRIPTION");
    for strategy in strategies {
        println!(
            "{:<8} {:>5.2} {:<40} {}",
            strategy.kind.name(),
            strategy.confidence,
            strategy.selector,
            strategy.description
        );
    }
}
