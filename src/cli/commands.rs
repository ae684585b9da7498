use clap::Subcommand;

use super::classify::ClassifyArgs;
use super::memory::MemoryArgs;
use super::rules::RulesArgs;
use super::run::RunArgs;
use super::strategies::StrategiesArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Execute task files, learning follow-ups from failures
    Run(RunArgs),

    /// Inspect and adjust learning rules
    Rules(RulesArgs),

    /// Inspect per-component selector memory
    Memory(MemoryArgs),

    /// Generate selector strategies for an element description
    Strategies(StrategiesArgs),

    /// Classify an error message into a failure reason
    Classify(ClassifyArgs),
}
