//! Step execution error types

use action_locator::LocatorError;
use browser_driver::DriverError;
use thiserror::Error;

/// Errors thrown by a single step
///
/// Only the rendered message crosses into the outcome, where it is classified.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Driver call failed
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Selector fallback exhausted
    #[error(transparent)]
    Locator(#[from] LocatorError),

    /// Step type outside the known set
    #[error("Unknown step type")]
    UnknownStep,
}
