//! Error types for locator system

use browser_driver::DriverError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Nothing usable could be derived from the target
    #[error("No selector strategies for target: {0}")]
    NoStrategies(String),

    /// Every strategy was tried and failed
    #[error("Element not found: all {attempts} strategies exhausted for {target}")]
    Exhausted { target: String, attempts: usize },

    /// Driver failure on the last attempt
    #[error(transparent)]
    Driver(#[from] DriverError),
}
