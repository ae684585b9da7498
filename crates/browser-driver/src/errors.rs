//! Error types for browser drivers
//!
//! Downstream failure classification works on the rendered message, so every
//! variant keeps the keyword that identifies its category.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriverError {
    /// No element matched the selector
    #[error("Selector not found: {0}")]
    ElementNotFound(String),

    /// Element exists but cannot receive the interaction
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Operation exceeded its timeout
    #[error("Timeout {timeout_ms}ms exceeded while {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Page navigation failed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// In-page script threw or returned garbage
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// Failure injected by a scripted page, reported verbatim
    #[error("{0}")]
    Scripted(String),

    /// Backend communication error
    #[error("Driver backend error: {0}")]
    Backend(String),
}

impl DriverError {
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}
