//! Option types passed to driver operations

pub use adaptive_core_types::{WaitState, WaitUntil};

/// Default timeout for element operations when the caller gives none
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    pub timeout_ms: Option<u64>,
}

impl ClickOptions {
    pub fn with_timeout(timeout_ms: Option<u64>) -> Self {
        Self { timeout_ms }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout_ms: Option<u64>,
    pub state: Option<WaitState>,
}

impl WaitOptions {
    pub fn new(timeout_ms: Option<u64>, state: Option<WaitState>) -> Self {
        Self { timeout_ms, state }
    }

    pub fn timeout_or_default(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS)
    }

    pub fn state_or_default(&self) -> WaitState {
        self.state.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeOptions {
    /// Delay between key presses in milliseconds
    pub delay_ms: Option<u64>,
}

impl TypeOptions {
    pub fn with_delay(delay_ms: Option<u64>) -> Self {
        Self { delay_ms }
    }
}
