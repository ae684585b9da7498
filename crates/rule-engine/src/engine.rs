//! Rule engine: failure handling and weight calibration

use crate::conflict::{resolve_conflict, score};
use crate::errors::RuleEngineError;
use crate::memory::{MemoryStore, INITIAL_MEMORY_CONFIDENCE};
use crate::rule::{LearningActionKind, Rule, RuleFeedback, RuleStatus, MIN_EFFECTIVE_WEIGHT};
use crate::rule_store::RuleStore;
use crate::selectors::synthesize_variants;
use adaptive_core_types::{FailureReason, Outcome, RuntimeTask, DEFAULT_STEP_TIMEOUT_MS};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Cap for `extend-timeout` when the rule gives none
pub const DEFAULT_MAX_TIMEOUT_MS: u64 = 60_000;
const TIMEOUT_GROWTH: f64 = 1.5;

/// Result of [`RuleEngine::handle_failure`]
#[derive(Debug, Clone, PartialEq)]
pub enum LearningOutcome {
    /// No reason on the outcome, or no rule applies
    NoMatch,

    /// Corrected follow-up task produced by `rule_id`
    FollowUp { task: RuntimeTask, rule_id: String },

    /// The selected rule had nothing to change
    Unchanged {
        task: RuntimeTask,
        rule_id: String,
        note: String,
    },

    /// The selected rule's action is not supported yet
    NotImplemented { rule_id: String, action: String },
}

impl LearningOutcome {
    pub fn follow_up(&self) -> Option<&RuntimeTask> {
        match self {
            LearningOutcome::FollowUp { task, .. } => Some(task),
            _ => None,
        }
    }

    pub fn rule_id(&self) -> Option<&str> {
        match self {
            LearningOutcome::NoMatch => None,
            LearningOutcome::FollowUp { rule_id, .. }
            | LearningOutcome::Unchanged { rule_id, .. }
            | LearningOutcome::NotImplemented { rule_id, .. } => Some(rule_id),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LearningOutcome::NoMatch => "no-match",
            LearningOutcome::FollowUp { .. } => "follow-up",
            LearningOutcome::Unchanged { .. } => "unchanged",
            LearningOutcome::NotImplemented { .. } => "not-implemented",
        }
    }
}

/// Owns the rule store and the component memory store
#[derive(Debug)]
pub struct RuleEngine {
    rules: RuleStore,
    memory: MemoryStore,
}

impl RuleEngine {
    pub fn new(rules: RuleStore, memory: MemoryStore) -> Self {
        Self { rules, memory }
    }

    /// Open both stores from disk
    pub fn open(
        rules_path: impl Into<PathBuf>,
        memory_path: impl Into<PathBuf>,
    ) -> Result<Self, RuleEngineError> {
        let rules = RuleStore::open(rules_path)?;
        let memory = MemoryStore::open(memory_path)?;
        info!(rules = rules.len(), components = memory.len(), "rule engine loaded");
        Ok(Self::new(rules, memory))
    }

    /// Engine without backing files
    pub fn in_memory(rules: Vec<Rule>) -> Self {
        Self::new(RuleStore::in_memory(rules), MemoryStore::in_memory())
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Enabled, effective rules keyed to `reason`, in declaration order
    pub fn candidates(&self, reason: FailureReason) -> Vec<Rule> {
        self.rules.filter(|rule| rule.is_candidate_for(reason))
    }

    /// Turn a failed outcome into a follow-up task, if any rule applies
    pub fn handle_failure(&self, task: &RuntimeTask, outcome: &Outcome) -> LearningOutcome {
        let Some(reason) = outcome.reason else {
            return LearningOutcome::NoMatch;
        };

        let candidates = self.candidates(reason);
        let Some(rule) = resolve_conflict(task, &candidates).cloned() else {
            debug!(task_id = %task.id, reason = %reason, "no rule for failure");
            return LearningOutcome::NoMatch;
        };
        info!(
            task_id = %task.id,
            reason = %reason,
            rule_id = %rule.id,
            action = %rule.learn.action,
            score = score(&rule, task),
            candidates = candidates.len(),
            "rule selected"
        );

        let result = match &rule.learn.action {
            LearningActionKind::InferAlternativeSelector => {
                self.infer_alternative_selector(task, outcome, &rule)
            }
            LearningActionKind::ExtendTimeout => extend_timeout(task, outcome, &rule),
            LearningActionKind::TryAlternativeRoute => LearningOutcome::NotImplemented {
                rule_id: rule.id.clone(),
                action: rule.learn.action.to_string(),
            },
            LearningActionKind::Other(name) => {
                warn!(rule_id = %rule.id, action = %name, "unknown learning action");
                unchanged(task, &rule, format!("unknown learning action '{name}'"))
            }
        };

        if let Err(err) = self
            .rules
            .update(&rule.id, |r| r.metadata.status = Some(RuleStatus::Pending))
        {
            warn!(rule_id = %rule.id, error = %err, "failed to persist pending rule status");
        }
        result
    }

    fn infer_alternative_selector(
        &self,
        task: &RuntimeTask,
        outcome: &Outcome,
        rule: &Rule,
    ) -> LearningOutcome {
        let Some(index) = outcome.failed_step else {
            return unchanged(task, rule, "outcome has no failed step");
        };
        let Some(original) = task.steps.get(index).and_then(|step| step.selector()) else {
            return unchanged(task, rule, "failed step has no selector");
        };
        let Some(component) = task.context.primary_component() else {
            return unchanged(task, rule, "task has no affected component");
        };

        let threshold = rule.learn.threshold.unwrap_or(0.0);
        let persist = rule.learn.persist.unwrap_or(true);

        let mut alternatives = match self.memory.get(component) {
            Some(memory) if !memory.strategies.is_empty() && memory.confidence >= threshold => {
                debug!(component, confidence = memory.confidence, "reusing remembered alternatives");
                memory.strategies
            }
            remembered => {
                let mut fresh = synthesize_variants(original);
                if let Some(memory) = remembered {
                    for strategy in memory.strategies {
                        if !fresh.contains(&strategy) {
                            fresh.push(strategy);
                        }
                    }
                }
                if persist {
                    if let Err(err) =
                        self.memory
                            .remember(component, fresh.clone(), INITIAL_MEMORY_CONFIDENCE)
                    {
                        warn!(component, error = %err, "failed to persist component memory");
                    }
                }
                fresh
            }
        };
        if let Some(max) = rule.learn.max_alternatives {
            alternatives.truncate(max.max(1));
        }

        let Some(choice) = alternatives.get(1).or_else(|| alternatives.first()).cloned() else {
            return unchanged(task, rule, "no alternative selectors available");
        };

        let mut next = task.derive_follow_up();
        if let Some(step) = next.steps.get_mut(index) {
            step.set_selector(choice.clone());
        }
        info!(
            task_id = %task.id,
            follow_up = %next.id,
            component,
            from = original,
            to = %choice,
            "alternative selector applied"
        );
        LearningOutcome::FollowUp {
            task: next,
            rule_id: rule.id.clone(),
        }
    }

    /// Positive feedback for the rule that produced a successful follow-up
    ///
    /// Unknown or absent rule ids are ignored.
    pub fn handle_success(
        &self,
        task: &RuntimeTask,
        rule_id: Option<&str>,
    ) -> Result<Option<Rule>, RuleEngineError> {
        let Some(rule_id) = rule_id else {
            return Ok(None);
        };
        if self.rules.get(rule_id).is_none() {
            debug!(task_id = %task.id, rule_id, "success reported for unknown rule");
            return Ok(None);
        }
        let rule = self.rules.update(rule_id, |rule| {
            rule.apply_success();
            rule.clone()
        })?;
        info!(
            task_id = %task.id,
            rule_id,
            weight = rule.weight,
            confidence = rule.confidence,
            "rule confirmed"
        );
        Ok(Some(rule))
    }

    /// Explicit weight update
    pub fn update_rule_weight(
        &self,
        rule_id: &str,
        feedback: RuleFeedback,
    ) -> Result<Rule, RuleEngineError> {
        let rule = self.rules.update(rule_id, |rule| {
            match feedback {
                RuleFeedback::Success => rule.apply_success(),
                RuleFeedback::Failure => rule.apply_failure(),
            }
            rule.clone()
        })?;
        if !rule.enabled && feedback == RuleFeedback::Failure {
            warn!(rule_id, weight = rule.weight, "rule disabled as ineffective");
        } else {
            debug!(rule_id, weight = rule.weight, confidence = rule.confidence, "rule weight updated");
        }
        Ok(rule)
    }

    /// Re-enable a rule at `weight`
    pub fn reset_rule(&self, rule_id: &str, weight: f64) -> Result<Rule, RuleEngineError> {
        if !(MIN_EFFECTIVE_WEIGHT..=1.0).contains(&weight) {
            return Err(RuleEngineError::InvalidWeight(weight));
        }
        let rule = self.rules.update(rule_id, |rule| {
            rule.weight = weight;
            rule.enabled = true;
            rule.metadata.status = None;
            rule.clone()
        })?;
        info!(rule_id, weight, "rule reset");
        Ok(rule)
    }
}

fn unchanged(task: &RuntimeTask, rule: &Rule, note: impl Into<String>) -> LearningOutcome {
    let note = note.into();
    debug!(task_id = %task.id, rule_id = %rule.id, note = %note, "rule left task unchanged");
    LearningOutcome::Unchanged {
        task: task.clone(),
        rule_id: rule.id.clone(),
        note,
    }
}

fn extend_timeout(task: &RuntimeTask, outcome: &Outcome, rule: &Rule) -> LearningOutcome {
    let Some(index) = outcome.failed_step else {
        return unchanged(task, rule, "outcome has no failed step");
    };
    let Some(step) = task.steps.get(index) else {
        return unchanged(task, rule, "failed step index out of range");
    };
    if !step.supports_timeout() {
        return unchanged(task, rule, "failed step carries no timeout");
    }

    let current = step.timeout().unwrap_or(DEFAULT_STEP_TIMEOUT_MS);
    let cap = rule.learn.max_timeout.unwrap_or(DEFAULT_MAX_TIMEOUT_MS);
    let extended = ((current as f64 * TIMEOUT_GROWTH).round() as u64).min(cap);

    let mut next = task.derive_follow_up();
    if let Some(step) = next.steps.get_mut(index) {
        step.set_timeout(extended);
    }
    info!(task_id = %task.id, follow_up = %next.id, from = current, to = extended, "timeout extended");
    LearningOutcome::FollowUp {
        task: next,
        rule_id: rule.id.clone(),
    }
}
