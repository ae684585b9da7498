//! Failure classification from raw error messages

use adaptive_core_types::FailureReason;

/// Keyword table, first match wins
const RULES: &[(&[&str], FailureReason)] = &[
    (&["selector", "not found"], FailureReason::SelectorNotFound),
    (&["timeout"], FailureReason::Timeout),
    (&["navigation"], FailureReason::NavigationFailed),
    (&["script", "evaluate"], FailureReason::ScriptError),
    (&["route"], FailureReason::UnexpectedRoute),
];

/// Map an error message onto the failure taxonomy
///
/// Pure function of the lowercased message; unmatched messages fall back to
/// `selector-not-found`.
pub fn classify_failure(message: &str) -> FailureReason {
    let lowered = message.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, reason)| *reason)
        .unwrap_or(FailureReason::SelectorNotFound)
}
