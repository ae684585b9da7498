//! Selector strategies - confidence-ranked element resolution
//!
//! This crate turns sparse element metadata into candidate selectors and
//! tries them against a browser driver:
//! - Strategy generation from test ids, ARIA attributes, text, ids, classes and paths
//! - Reverse parsing of a raw selector into partial element metadata
//! - Smart click/type/wait that walk the candidates in confidence order

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
