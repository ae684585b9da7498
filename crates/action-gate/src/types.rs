//! Core types for gate checks

use serde::{Deserialize, Serialize};

pub const DEFAULT_SIGNAL_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_ERROR_TOAST_SELECTOR: &str = ".error-toast, [role=\"alert\"]";

/// Result of one precondition or signal check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Check type tag, e.g. `dom-visible`
    pub check: String,

    /// Whether the check passed
    pub passed: bool,

    /// Reasons for pass/fail
    pub reasons: Vec<String>,

    /// Check latency in milliseconds
    pub latency_ms: u64,
}

impl GateResult {
    /// Create a passing result
    pub fn pass(check: impl Into<String>, reasons: Vec<String>) -> Self {
        Self {
            check: check.into(),
            passed: true,
            reasons,
            latency_ms: 0,
        }
    }

    /// Create a failing result
    pub fn fail(check: impl Into<String>, reasons: Vec<String>) -> Self {
        Self {
            check: check.into(),
            passed: false,
            reasons,
            latency_ms: 0,
        }
    }

    /// Pass or fail from a boolean answer
    pub fn from_bool(check: impl Into<String>, passed: bool, reason: impl Into<String>) -> Self {
        let reasons = vec![reason.into()];
        if passed {
            Self::pass(check, reasons)
        } else {
            Self::fail(check, reasons)
        }
    }

    /// Set latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Reasons joined for error messages
    pub fn summary(&self) -> String {
        if self.reasons.is_empty() {
            self.check.clone()
        } else {
            format!("{}: {}", self.check, self.reasons.join("; "))
        }
    }
}

/// Gate tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Timeout for signal checks that declare none
    pub signal_timeout_ms: u64,

    /// Selector used by `no-error-toast` when the signal gives none
    pub error_toast_selector: String,

    /// Interval between probes of polled checks
    pub poll_interval_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            signal_timeout_ms: DEFAULT_SIGNAL_TIMEOUT_MS,
            error_toast_selector: DEFAULT_ERROR_TOAST_SELECTOR.to_string(),
            poll_interval_ms: 100,
        }
    }
}
