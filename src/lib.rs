//! Adaptive runner
//!
//! Executes declarative browser tasks, learns corrective follow-ups from the
//! failures through the rule engine, and exposes it all through the CLI.

pub mod cli;
pub mod config;
pub mod runner;
pub mod task_source;

pub use config::{load_config, DriverKind, LoadedConfig, RunnerConfig};
pub use runner::{AdaptiveRunner, Attempt, RunReport, TaskRun};
pub use task_source::{load_tasks, parse_tasks};
