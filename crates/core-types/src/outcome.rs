//! Outcome of executing one runtime task

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed failure taxonomy, used both as outcome tags and as rule-matching keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    SelectorNotFound,
    Timeout,
    NavigationFailed,
    ScriptError,
    UnexpectedRoute,
    SignalNotMet,
    PreconditionFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::SelectorNotFound => "selector-not-found",
            FailureReason::Timeout => "timeout",
            FailureReason::NavigationFailed => "navigation-failed",
            FailureReason::ScriptError => "script-error",
            FailureReason::UnexpectedRoute => "unexpected-route",
            FailureReason::SignalNotMet => "signal-not-met",
            FailureReason::PreconditionFailed => "precondition-failed",
        }
    }

    pub fn all() -> [FailureReason; 7] {
        [
            FailureReason::SelectorNotFound,
            FailureReason::Timeout,
            FailureReason::NavigationFailed,
            FailureReason::ScriptError,
            FailureReason::UnexpectedRoute,
            FailureReason::SignalNotMet,
            FailureReason::PreconditionFailed,
        ]
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailureReason::all()
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| format!("unknown failure reason: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Aborted,
    Pending,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Aborted => "aborted",
            OutcomeStatus::Pending => "pending",
        }
    }
}

/// Terminal record of one task execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub status: OutcomeStatus,

    /// Index of the failing step; absent for precondition and signal failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock milliseconds since task start
    pub duration: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl Outcome {
    pub fn success(duration: u64) -> Self {
        Self {
            status: OutcomeStatus::Success,
            failed_step: None,
            reason: None,
            error: None,
            duration,
            screenshot: None,
        }
    }

    /// A non-optional step threw
    pub fn step_failure(
        index: usize,
        reason: FailureReason,
        error: impl Into<String>,
        duration: u64,
    ) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            failed_step: Some(index),
            reason: Some(reason),
            error: Some(error.into()),
            duration,
            screenshot: None,
        }
    }

    /// A precondition did not hold; no step ran
    pub fn precondition_failure(error: impl Into<String>, duration: u64) -> Self {
        Self {
            status: OutcomeStatus::Aborted,
            failed_step: None,
            reason: Some(FailureReason::PreconditionFailed),
            error: Some(error.into()),
            duration,
            screenshot: None,
        }
    }

    /// A signal was not met after all steps resolved
    pub fn signal_failure(error: impl Into<String>, duration: u64) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            failed_step: None,
            reason: Some(FailureReason::SignalNotMet),
            error: Some(error.into()),
            duration,
            screenshot: None,
        }
    }

    pub fn with_screenshot(mut self, screenshot: Option<String>) -> Self {
        self.screenshot = screenshot;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_round_trips_through_str() {
        for reason in FailureReason::all() {
            assert_eq!(reason.as_str().parse::<FailureReason>(), Ok(reason));
        }
        assert!("flaky".parse::<FailureReason>().is_err());
    }

    #[test]
    fn test_step_failure_serializes_camel_case() {
        let outcome = Outcome::step_failure(
            0,
            FailureReason::SelectorNotFound,
            "Selector not found: #go",
            12,
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["failedStep"], 0);
        assert_eq!(value["reason"], "selector-not-found");
        assert!(value.get("screenshot").is_none());
    }

    #[test]
    fn test_success_has_no_failure_fields() {
        let outcome = Outcome::success(3);
        assert!(outcome.is_success());
        assert!(outcome.failed_step.is_none());
        assert!(outcome.reason.is_none());
        assert!(outcome.error.is_none());
    }
}
