//! Error types for gate checks

use browser_driver::DriverError;
use thiserror::Error;

/// Gate check error enumeration
#[derive(Debug, Error, Clone)]
pub enum GateError {
    /// Check declaration cannot be evaluated
    #[error("Invalid check: {0}")]
    InvalidCheck(String),

    /// Driver failed while answering the check
    #[error(transparent)]
    Driver(#[from] DriverError),
}
