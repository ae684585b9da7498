use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use rule_engine::ComponentMemory;
use std::collections::BTreeMap;

use super::context::CliContext;
use super::output::print_json;

#[derive(Args, Clone, Debug)]
pub struct MemoryArgs {
    #[command(subcommand)]
    pub command: MemoryCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MemoryCommand {
    /// List remembered components
    List,
    /// Show the alternatives remembered for a component
    Show {
        #[arg(value_name = "COMPONENT")]
        component: String,
    },
    /// Drop a component's alternatives
    Forget {
        #[arg(value_name = "COMPONENT")]
        component: String,
    },
}

pub fn cmd_memory(args: MemoryArgs, ctx: &CliContext) -> Result<()> {
    let engine = ctx.open_engine()?;
    let memory = engine.memory();

    match args.command {
        MemoryCommand::List => {
            let entries = memory.list();
            if ctx.json() {
                let map: BTreeMap<String, ComponentMemory> = entries.into_iter().collect();
                print_json(&map)?;
            } else {
                print_memory_table(&entries);
            }
        }
        MemoryCommand::Show { component } => {
            let Some(entry) = memory.get(&component) else {
                bail!("No memory recorded for component {}", component);
            };
            if ctx.json() {
                print_json(&entry)?;
            } else {
                println!(
                    "{} (confidence={:.2}, updated={})",
                    component,
                    entry.confidence,
                    entry.updated_at.to_rfc3339()
                );
                for (idx, strategy) in entry.strategies.iter().enumerate() {
                    println!("  {}. {}", idx + 1, strategy);
                }
            }
        }
        MemoryCommand::Forget { component } => {
            if memory.forget(&component)?.is_some() {
                println!("Forgot component {}", component);
            } else {
                println!("No memory recorded for component {}", component);
            }
        }
    }

    Ok(())
}

fn print_memory_table(entries: &[(String, ComponentMemory)]) {
    println!("{:<28} {:>6} {:>5} {}", "COMPONENT", "CONF", "ALTS", "UPDATED");
    for (name, entry) in entries {
        println!(
            "{:<28} {:>6.2} {:>5} {}",
            name,
            entry.confidence,
            entry.strategies.len(),
            entry.updated_at.to_rfc3339()
        );
    }
}
