//! Rule model

use adaptive_core_types::FailureReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rules below this weight are never selected and get disabled
pub const MIN_EFFECTIVE_WEIGHT: f64 = 0.25;

/// Share of the remaining gap to 1.0 gained on success
pub const SUCCESS_WEIGHT_GAIN: f64 = 0.15;
pub const SUCCESS_CONFIDENCE_GAIN: f64 = 0.1;
pub const FAILURE_WEIGHT_FACTOR: f64 = 0.7;
pub const FAILURE_CONFIDENCE_LOSS: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    #[default]
    Global,
    Component,
    Route,
    Signal,
}

impl RuleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Global => "global",
            RuleScope::Component => "component",
            RuleScope::Route => "route",
            RuleScope::Signal => "signal",
        }
    }
}

/// Correction a rule applies; unknown names are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LearningActionKind {
    InferAlternativeSelector,
    ExtendTimeout,
    TryAlternativeRoute,
    Other(String),
}

impl LearningActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            LearningActionKind::InferAlternativeSelector => "infer-alternative-selector",
            LearningActionKind::ExtendTimeout => "extend-timeout",
            LearningActionKind::TryAlternativeRoute => "try-alternative-route",
            LearningActionKind::Other(name) => name,
        }
    }
}

impl From<String> for LearningActionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "infer-alternative-selector" => LearningActionKind::InferAlternativeSelector,
            "extend-timeout" => LearningActionKind::ExtendTimeout,
            "try-alternative-route" => LearningActionKind::TryAlternativeRoute,
            _ => LearningActionKind::Other(value),
        }
    }
}

impl From<LearningActionKind> for String {
    fn from(kind: LearningActionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for LearningActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningAction {
    pub action: LearningActionKind,

    /// Free-form strategy hint, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Keep at most this many synthesized alternatives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_alternatives: Option<usize>,

    /// Cap for `extend-timeout`, milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout: Option<u64>,

    /// Minimum memory confidence for reusing remembered alternatives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    /// Record synthesized alternatives in component memory (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist: Option<bool>,
}

impl LearningAction {
    pub fn new(action: LearningActionKind) -> Self {
        Self {
            action,
            strategy: None,
            max_alternatives: None,
            max_timeout: None,
            threshold: None,
            persist: None,
        }
    }

    pub fn with_max_timeout(mut self, max_timeout: u64) -> Self {
        self.max_timeout = Some(max_timeout);
        self
    }

    pub fn with_max_alternatives(mut self, max: usize) -> Self {
        self.max_alternatives = Some(max);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = Some(persist);
        self
    }
}

/// Where a rule stands after its last application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Pending,
    Confirmed,
    Penalized,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Pending => "pending",
            RuleStatus::Confirmed => "confirmed",
            RuleStatus::Penalized => "penalized",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleMetadata {
    pub success_count: u64,
    pub failure_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RuleStatus>,
}

fn default_enabled() -> bool {
    true
}

/// Weighted policy mapping a failure reason to a corrective mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub scope: RuleScope,
    /// Failure reason tag this rule reacts to
    pub on_failure: String,
    pub learn: LearningAction,
    pub weight: f64,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: RuleMetadata,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        on_failure: FailureReason,
        learn: LearningAction,
        weight: f64,
        confidence: f64,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            enabled: true,
            scope: RuleScope::Global,
            on_failure: on_failure.as_str().to_string(),
            learn,
            weight,
            confidence,
            metadata: RuleMetadata::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn triggers_on(&self, reason: FailureReason) -> bool {
        self.on_failure == reason.as_str()
    }

    pub fn is_effective(&self) -> bool {
        self.weight >= MIN_EFFECTIVE_WEIGHT
    }

    /// Enabled, effective and keyed to `reason`
    pub fn is_candidate_for(&self, reason: FailureReason) -> bool {
        self.enabled && self.is_effective() && self.triggers_on(reason)
    }

    pub(crate) fn apply_success(&mut self) {
        self.weight += (1.0 - self.weight) * SUCCESS_WEIGHT_GAIN;
        self.confidence = (self.confidence + SUCCESS_CONFIDENCE_GAIN).min(1.0);
        self.metadata.success_count += 1;
        self.metadata.status = Some(RuleStatus::Confirmed);
    }

    pub(crate) fn apply_failure(&mut self) {
        self.weight *= FAILURE_WEIGHT_FACTOR;
        self.confidence = (self.confidence - FAILURE_CONFIDENCE_LOSS).max(0.0);
        self.metadata.failure_count += 1;
        self.metadata.status = Some(RuleStatus::Penalized);
        if !self.is_effective() {
            self.enabled = false;
        }
    }
}

/// Outcome reported for a rule application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFeedback {
    Success,
    Failure,
}

/// Rule set used when no rule store exists yet
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "infer-selector",
            FailureReason::SelectorNotFound,
            LearningAction::new(LearningActionKind::InferAlternativeSelector),
            0.8,
            0.7,
        )
        .named("Infer alternative selector"),
        Rule::new(
            "extend-timeout",
            FailureReason::Timeout,
            LearningAction::new(LearningActionKind::ExtendTimeout).with_max_timeout(60_000),
            0.7,
            0.6,
        )
        .named("Extend step timeout"),
        Rule::new(
            "alternate-route-navigation",
            FailureReason::NavigationFailed,
            LearningAction::new(LearningActionKind::TryAlternativeRoute),
            0.5,
            0.5,
        )
        .named("Try alternative route after navigation failure"),
        Rule::new(
            "alternate-route-unexpected",
            FailureReason::UnexpectedRoute,
            LearningAction::new(LearningActionKind::TryAlternativeRoute),
            0.5,
            0.5,
        )
        .named("Try alternative route after landing elsewhere"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_document_parses() {
        let yaml = r#"
id: r1
name: Retry with alternative selector
onFailure: selector-not-found
learn:
  action: infer-alternative-selector
  maxAlternatives: 3
weight: 0.8
confidence: 0.8
"#;
        let rule: Rule = serde_yaml::from_str(yaml).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.scope, RuleScope::Global);
        assert_eq!(
            rule.learn.action,
            LearningActionKind::InferAlternativeSelector
        );
        assert_eq!(rule.learn.max_alternatives, Some(3));
        assert!(rule.triggers_on(FailureReason::SelectorNotFound));
        assert_eq!(rule.metadata, RuleMetadata::default());
    }

    #[test]
    fn test_unknown_action_is_preserved() {
        let rule: Rule = serde_json::from_str(
            r#"{"id":"r","name":"r","onFailure":"timeout","learn":{"action":"reload-page"},"weight":0.5,"confidence":0.5}"#,
        )
        .unwrap();
        assert_eq!(
            rule.learn.action,
            LearningActionKind::Other("reload-page".into())
        );
        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["learn"]["action"], "reload-page");
    }

    #[test]
    fn test_success_moves_toward_one() {
        let mut rule = default_rules().remove(0);
        rule.weight = 0.6;
        rule.confidence = 0.95;
        rule.apply_success();
        assert!((rule.weight - 0.66).abs() < 1e-9);
        assert_eq!(rule.confidence, 1.0);
        assert_eq!(rule.metadata.success_count, 1);
        assert_eq!(rule.metadata.status, Some(RuleStatus::Confirmed));
    }

    #[test]
    fn test_failure_decays_and_disables() {
        let mut rule = default_rules().remove(0);
        rule.weight = 0.3;
        rule.confidence = 0.1;
        rule.apply_failure();
        assert!((rule.weight - 0.21).abs() < 1e-9);
        assert_eq!(rule.confidence, 0.0);
        assert!(!rule.enabled);
        assert_eq!(rule.metadata.failure_count, 1);
    }
}
