//! Executor configuration

use serde::{Deserialize, Serialize};

/// Pause for a `wait` step that names no selector
pub const DEFAULT_WAIT_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Attach a screenshot reference to failed outcomes
    pub capture_screenshots: bool,

    /// Retry failed click/type/wait steps through the selector strategy fallback
    pub smart_selectors: bool,

    /// Pause for selector-less wait steps without a timeout
    pub default_wait_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            capture_screenshots: false,
            smart_selectors: false,
            default_wait_ms: DEFAULT_WAIT_MS,
        }
    }
}
