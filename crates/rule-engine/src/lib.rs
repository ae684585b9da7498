//! Rule engine - closed-loop learning from failed outcomes
//!
//! A failed outcome is matched against weighted rules keyed by failure reason.
//! The winning rule rewrites the task (alternative selector, longer timeout)
//! into a follow-up, and later feedback moves the rule's weight and confidence.
//! Rules and per-component selector memory are persisted after every mutation.

pub mod conflict;
pub mod engine;
pub mod errors;
pub mod memory;
pub mod rule;
pub mod rule_store;
pub mod selectors;

pub use conflict::{context_match, resolve_conflict, score};
pub use engine::{LearningOutcome, RuleEngine};
pub use errors::RuleEngineError;
pub use memory::{ComponentMemory, MemoryStore};
pub use rule::*;
pub use rule_store::RuleStore;
pub use selectors::synthesize_variants;
