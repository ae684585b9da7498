//! Shared model for the adaptive runner crates
//!
//! Runtime tasks are declarative browser-interaction scripts:
//! - preconditions checked before anything runs
//! - an ordered sequence of steps
//! - signals evaluated once every step has resolved
//!
//! Executing a task yields exactly one [`Outcome`]. Follow-up tasks synthesized
//! by the rule engine are derived through [`RuntimeTask::derive_follow_up`].

pub mod errors;
pub mod outcome;
pub mod steps;
pub mod task;

pub use errors::*;
pub use outcome::*;
pub use steps::*;
pub use task::*;
