//! Runtime task definition and lineage

use crate::errors::TaskError;
use crate::outcome::Outcome;
use crate::steps::{Precondition, Signal, Step};
use serde::{Deserialize, Serialize};

/// Change context a task was generated for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    #[serde(default)]
    pub changed_files: Vec<String>,

    #[serde(default)]
    pub affected_components: Vec<String>,

    #[serde(default)]
    pub affected_routes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
}

impl TaskContext {
    pub fn has_components(&self) -> bool {
        !self.affected_components.is_empty()
    }

    pub fn has_routes(&self) -> bool {
        !self.affected_routes.is_empty()
    }

    pub fn primary_component(&self) -> Option<&str> {
        self.affected_components.first().map(String::as_str)
    }
}

/// Who created a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOrigin {
    Ai,
    Rule,
    #[default]
    Manual,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    #[serde(default)]
    pub created_by: TaskOrigin,

    #[serde(default)]
    pub retry_count: u32,

    /// Id of the task this one was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Declarative browser-interaction script
///
/// Tasks are never mutated in place once handed to the executor; corrective
/// variants are produced with [`RuntimeTask::derive_follow_up`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeTask {
    pub id: String,

    pub intent: String,

    /// Prior probability of success (0.0-1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    #[serde(default)]
    pub context: TaskContext,

    #[serde(default)]
    pub preconditions: Vec<Precondition>,

    pub steps: Vec<Step>,

    #[serde(default)]
    pub signals: Vec<Signal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TaskMetadata>,
}

fn default_confidence() -> f64 {
    0.5
}

impl RuntimeTask {
    pub fn new(id: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            intent: intent.into(),
            confidence: default_confidence(),
            context: TaskContext::default(),
            preconditions: Vec::new(),
            steps: Vec::new(),
            signals: Vec::new(),
            outcome: None,
            metadata: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.context.affected_components.push(component.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.context.affected_routes.push(route.into());
        self
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn with_metadata(mut self, metadata: TaskMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn retry_count(&self) -> u32 {
        self.metadata.as_ref().map(|m| m.retry_count).unwrap_or(0)
    }

    pub fn origin(&self) -> TaskOrigin {
        self.metadata
            .as_ref()
            .map(|m| m.created_by)
            .unwrap_or_default()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.parent_id.as_deref())
    }

    /// Clone this task as a rule-synthesized follow-up.
    ///
    /// The copy gets the next id in the lineage, an incremented retry count,
    /// `created_by = rule`, a parent pointer and no recorded outcome. Callers
    /// then apply their correction to the returned copy.
    pub fn derive_follow_up(&self) -> RuntimeTask {
        let mut next = self.clone();
        next.id = bump_task_id(&self.id);
        next.outcome = None;
        next.metadata = Some(TaskMetadata {
            created_by: TaskOrigin::Rule,
            retry_count: self.retry_count() + 1,
            parent_id: Some(self.id.clone()),
        });
        next
    }
}

/// Increment the trailing integer of a task id, preserving zero padding.
///
/// `t1` becomes `t2`, `task-009` becomes `task-010`; an id without a trailing
/// integer gets `-1` appended.
pub fn bump_task_id(id: &str) -> String {
    let digits_start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx);

    let Some(start) = digits_start else {
        return format!("{id}-1");
    };

    let (prefix, digits) = id.split_at(start);
    match digits.parse::<u64>() {
        Ok(value) => {
            let width = digits.len();
            format!("{prefix}{:0width$}", value.saturating_add(1))
        }
        // More digits than fit in a u64: treat as opaque
        Err(_) => format!("{id}-1"),
    }
}

/// Structural checks applied when tasks are loaded from an external source
pub fn validate_task(task: &RuntimeTask) -> Result<(), TaskError> {
    if task.id.trim().is_empty() {
        return Err(TaskError::invalid("<empty>", "task id cannot be empty"));
    }
    if !(0.0..=1.0).contains(&task.confidence) {
        return Err(TaskError::invalid(
            &task.id,
            format!("confidence {} outside [0, 1]", task.confidence),
        ));
    }
    if task.steps.is_empty() {
        return Err(TaskError::invalid(&task.id, "task has no steps"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::Step;
    use serde_json::json;

    #[test]
    fn test_bump_task_id() {
        assert_eq!(bump_task_id("t1"), "t2");
        assert_eq!(bump_task_id("t9"), "t10");
        assert_eq!(bump_task_id("task-009"), "task-010");
        assert_eq!(bump_task_id("login-flow"), "login-flow-1");
        assert_eq!(bump_task_id("42"), "43");
    }

    #[test]
    fn test_derive_follow_up_tracks_lineage() {
        let task = RuntimeTask::new("t1", "submit the form")
            .with_component("SubmitButton")
            .with_step(Step::click("[data-testid=\"submit\"]"));

        let follow_up = task.derive_follow_up();
        assert_eq!(follow_up.id, "t2");
        assert_eq!(follow_up.retry_count(), 1);
        assert_eq!(follow_up.origin(), TaskOrigin::Rule);
        assert_eq!(follow_up.parent_id(), Some("t1"));
        assert_eq!(follow_up.steps, task.steps);

        let second = follow_up.derive_follow_up();
        assert_eq!(second.id, "t3");
        assert_eq!(second.retry_count(), 2);
        assert_eq!(second.parent_id(), Some("t2"));

        // parent is untouched
        assert!(task.metadata.is_none());
    }

    #[test]
    fn test_task_document_parses() {
        let task: RuntimeTask = serde_json::from_value(json!({
            "id": "checkout-001",
            "intent": "complete checkout",
            "confidence": 0.8,
            "context": {
                "changedFiles": ["src/Checkout.tsx"],
                "affectedComponents": ["CheckoutButton"],
                "affectedRoutes": ["/checkout"],
                "commitHash": "abc123"
            },
            "preconditions": [{"type": "auth-required"}],
            "steps": [
                {"type": "navigate", "url": "/checkout"},
                {"type": "click", "selector": "[data-testid=\"pay\"]", "timeout": 5000}
            ],
            "signals": [{"type": "route-match", "value": "/thanks"}],
            "metadata": {"createdBy": "ai", "retryCount": 0}
        }))
        .unwrap();

        assert_eq!(task.context.primary_component(), Some("CheckoutButton"));
        assert_eq!(task.steps.len(), 2);
        assert_eq!(task.origin(), TaskOrigin::Ai);
        assert!(validate_task(&task).is_ok());
    }

    #[test]
    fn test_validate_task_rejects_bad_tasks() {
        let empty = RuntimeTask::new("t1", "nothing");
        assert!(validate_task(&empty).is_err());

        let overconfident = RuntimeTask::new("t1", "x")
            .with_confidence(1.5)
            .with_step(Step::hover("#a"));
        assert!(validate_task(&overconfident).is_err());

        let unnamed = RuntimeTask::new(" ", "x").with_step(Step::hover("#a"));
        assert!(validate_task(&unnamed).is_err());
    }
}
