//! Task execution
//!
//! Turns one runtime task into exactly one outcome: preconditions in order,
//! then steps one at a time, then signals. Step failures are classified from
//! the error message into the closed failure taxonomy.

pub mod classify;
pub mod errors;
pub mod executor;
pub mod types;

pub use classify::classify_failure;
pub use errors::FlowError;
pub use executor::{DefaultTaskExecutor, TaskExecutor};
pub use types::ExecutorConfig;
