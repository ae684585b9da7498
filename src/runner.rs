//! Adaptive driver loop
//!
//! Executes a task, asks the rule engine for a corrective follow-up when it
//! fails, executes that, and feeds follow-up results back into rule weights
//! and component memory.

use crate::config::{LearningConfig, RunnerConfig};
use action_flow::{DefaultTaskExecutor, TaskExecutor};
use action_gate::DriverGateValidator;
use action_locator::SmartLocator;
use adaptive_core_types::{Outcome, RuntimeTask};
use anyhow::{Context, Result};
use browser_driver::SharedDriver;
use chrono::{DateTime, Utc};
use rule_engine::{LearningActionKind, LearningOutcome, RuleEngine, RuleFeedback};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One execution inside a task's attempt chain
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub task_id: String,

    /// Rule that synthesized this attempt's task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,

    pub outcome: Outcome,

    /// What the rule engine made of a failed outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A root task and every follow-up derived from it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRun {
    pub root_id: String,
    pub attempts: Vec<Attempt>,
}

impl TaskRun {
    pub fn final_outcome(&self) -> Option<&Outcome> {
        self.attempts.last().map(|attempt| &attempt.outcome)
    }

    pub fn succeeded(&self) -> bool {
        self.final_outcome().is_some_and(Outcome::is_success)
    }

    /// Succeeded only after at least one follow-up
    pub fn recovered(&self) -> bool {
        self.succeeded() && self.attempts.len() > 1
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks: Vec<TaskRun>,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Rule applied to produce the task currently executing
struct AppliedRule {
    rule_id: String,
    /// Set when the rule rewrote a selector from component memory
    component: Option<String>,
}

pub struct AdaptiveRunner {
    executor: Arc<dyn TaskExecutor>,
    engine: Arc<RuleEngine>,
    learning: LearningConfig,
}

impl AdaptiveRunner {
    pub fn new(
        executor: Arc<dyn TaskExecutor>,
        engine: Arc<RuleEngine>,
        learning: LearningConfig,
    ) -> Self {
        Self {
            executor,
            engine,
            learning,
        }
    }

    /// Wire executor, gate, locator and rule engine from configuration
    pub fn from_config(config: &RunnerConfig, driver: SharedDriver) -> Result<Self> {
        let engine = RuleEngine::open(&config.storage.rules_path, &config.storage.memory_path)
            .context("Failed to open rule engine stores")?;
        Ok(Self::with_engine(config, driver, Arc::new(engine)))
    }

    pub fn with_engine(config: &RunnerConfig, driver: SharedDriver, engine: Arc<RuleEngine>) -> Self {
        let gate = Arc::new(DriverGateValidator::with_config(
            driver.clone(),
            config.executor.gate_config(),
        ));
        let locator = Arc::new(SmartLocator::with_config(
            driver.clone(),
            config.locator.clone(),
        ));
        let executor = DefaultTaskExecutor::new(driver, gate)
            .with_config(config.executor.executor_config())
            .with_locator(locator);
        Self::new(Arc::new(executor), engine, config.learning.clone())
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Run a root task and its follow-ups
    pub async fn run_task(&self, task: &RuntimeTask) -> TaskRun {
        let mut attempts = Vec::new();
        let mut current = task.clone();
        let mut applied: Option<AppliedRule> = None;
        let mut follow_ups = 0u32;

        loop {
            let outcome = self.executor.execute(&current).await;
            if let Some(rule) = applied.as_ref() {
                self.report(&current, rule, &outcome);
            }

            let mut attempt = Attempt {
                task_id: current.id.clone(),
                rule_id: applied.as_ref().map(|rule| rule.rule_id.clone()),
                outcome,
                learning: None,
                note: None,
            };

            if attempt.outcome.is_success() {
                attempts.push(attempt);
                break;
            }
            if follow_ups >= self.learning.max_follow_ups {
                info!(
                    root_id = %task.id,
                    follow_ups,
                    "follow-up budget exhausted"
                );
                attempt.note = Some("follow-up budget exhausted".to_string());
                attempts.push(attempt);
                break;
            }

            let learning = self.engine.handle_failure(&current, &attempt.outcome);
            attempt.learning = Some(learning.label().to_string());
            match learning {
                LearningOutcome::FollowUp { task: next, rule_id } => {
                    attempts.push(attempt);
                    applied = Some(self.applied_rule(&next, rule_id));
                    current = next;
                    follow_ups += 1;
                }
                LearningOutcome::Unchanged { note, .. } => {
                    attempt.note = Some(note);
                    attempts.push(attempt);
                    break;
                }
                LearningOutcome::NotImplemented { action, .. } => {
                    attempt.note = Some(format!("learning action '{action}' is not implemented"));
                    attempts.push(attempt);
                    break;
                }
                LearningOutcome::NoMatch => {
                    attempts.push(attempt);
                    break;
                }
            }
        }

        let run = TaskRun {
            root_id: task.id.clone(),
            attempts,
        };
        info!(
            root_id = %run.root_id,
            attempts = run.attempts.len(),
            succeeded = run.succeeded(),
            "task finished"
        );
        run
    }

    /// Run tasks one after another
    pub async fn run_all(&self, tasks: &[RuntimeTask]) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, tasks = tasks.len(), "run started");

        let mut runs = Vec::with_capacity(tasks.len());
        for task in tasks {
            runs.push(self.run_task(task).await);
        }

        let succeeded = runs.iter().filter(|run| run.succeeded()).count();
        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            failed: runs.len() - succeeded,
            succeeded,
            tasks: runs,
        };
        info!(%run_id, succeeded = report.succeeded, failed = report.failed, "run finished");
        report
    }

    fn applied_rule(&self, next: &RuntimeTask, rule_id: String) -> AppliedRule {
        let rewrites_selector = self
            .engine
            .rules()
            .get(&rule_id)
            .is_some_and(|rule| rule.learn.action == LearningActionKind::InferAlternativeSelector);
        AppliedRule {
            component: rewrites_selector
                .then(|| next.context.primary_component().map(str::to_string))
                .flatten(),
            rule_id,
        }
    }

    /// Feed a follow-up's outcome back to the rule and memory that produced it
    fn report(&self, task: &RuntimeTask, rule: &AppliedRule, outcome: &Outcome) {
        if !self.learning.confirm_outcomes {
            return;
        }
        let success = outcome.is_success();
        let result = if success {
            self.engine
                .handle_success(task, Some(&rule.rule_id))
                .map(|_| ())
        } else {
            self.engine
                .update_rule_weight(&rule.rule_id, RuleFeedback::Failure)
                .map(|_| ())
        };
        if let Err(err) = result {
            warn!(rule_id = %rule.rule_id, error = %err, "failed to record rule feedback");
        }

        if let Some(component) = rule.component.as_deref() {
            match self.engine.memory().record_outcome(component, success) {
                Ok(Some(memory)) => {
                    debug!(component, confidence = memory.confidence, "component memory updated")
                }
                Ok(None) => {}
                Err(err) => warn!(component, error = %err, "failed to update component memory"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_core_types::{FailureReason, OutcomeStatus, Step, StepAction};
    use browser_driver::ScriptedDriver;
    use rule_engine::default_rules;

    fn runner(driver: Arc<ScriptedDriver>, config: RunnerConfig) -> AdaptiveRunner {
        let engine = Arc::new(RuleEngine::in_memory(default_rules()));
        AdaptiveRunner::with_engine(&config, driver, engine)
    }

    fn submit_task() -> RuntimeTask {
        RuntimeTask::new("t1", "submit the form")
            .with_component("SubmitButton")
            .with_step(Step::click("[data-testid=\"submit\"]"))
    }

    #[tokio::test]
    async fn test_success_needs_no_follow_up() {
        let driver = Arc::new(ScriptedDriver::new().with_visible(["[data-testid=\"submit\"]"]));
        let runner = runner(driver, RunnerConfig::default());

        let run = runner.run_task(&submit_task()).await;
        assert!(run.succeeded());
        assert!(!run.recovered());
        assert_eq!(run.attempts.len(), 1);
        assert!(run.attempts[0].rule_id.is_none());
    }

    #[tokio::test]
    async fn test_selector_failure_recovers_and_confirms_rule() {
        let driver = Arc::new(ScriptedDriver::new().with_visible(["[data-test=\"submit\"]"]));
        let runner = runner(driver.clone(), RunnerConfig::default());

        let run = runner.run_task(&submit_task()).await;
        assert!(run.recovered());
        assert_eq!(run.attempts.len(), 2);
        assert_eq!(
            run.attempts[0].outcome.reason,
            Some(FailureReason::SelectorNotFound)
        );
        assert_eq!(run.attempts[0].learning.as_deref(), Some("follow-up"));
        assert_eq!(run.attempts[1].task_id, "t2");
        assert_eq!(run.attempts[1].rule_id.as_deref(), Some("infer-selector"));

        let rule = runner.engine().rules().get("infer-selector").unwrap();
        assert_eq!(rule.metadata.success_count, 1);
        assert!(rule.weight > 0.8);

        let memory = runner.engine().memory().get("SubmitButton").unwrap();
        assert!((memory.confidence - 0.6).abs() < 1e-9);
        assert_eq!(driver.calls_for("click").last().unwrap(), "[data-test=\"submit\"]");
    }

    #[tokio::test]
    async fn test_follow_up_budget_is_respected() {
        let driver = Arc::new(ScriptedDriver::new());
        let mut config = RunnerConfig::default();
        config.learning.max_follow_ups = 0;
        let runner = runner(driver, config);

        let run = runner.run_task(&submit_task()).await;
        assert_eq!(run.attempts.len(), 1);
        assert!(!run.succeeded());
        assert_eq!(
            run.attempts[0].note.as_deref(),
            Some("follow-up budget exhausted")
        );
    }

    #[tokio::test]
    async fn test_failed_follow_up_penalizes_rule() {
        let driver = Arc::new(ScriptedDriver::new());
        let mut config = RunnerConfig::default();
        config.learning.max_follow_ups = 1;
        let runner = runner(driver, config);

        let run = runner.run_task(&submit_task()).await;
        assert_eq!(run.attempts.len(), 2);
        assert!(!run.succeeded());

        let rule = runner.engine().rules().get("infer-selector").unwrap();
        assert_eq!(rule.metadata.failure_count, 1);
        assert!((rule.weight - 0.56).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_wait_timeout_extends_step_timeout() {
        let driver = Arc::new(ScriptedDriver::new());
        let mut config = RunnerConfig::default();
        config.learning.max_follow_ups = 2;
        let runner = runner(driver.clone(), config);
        let task = RuntimeTask::new("slow-1", "wait for the report").with_step(Step::new(
            StepAction::Wait {
                selector: Some("#report".into()),
                timeout: Some(10),
                state: None,
            },
        ));

        let run = runner.run_task(&task).await;
        assert_eq!(run.attempts.len(), 3);
        assert!(!run.succeeded());
        assert_eq!(
            run.attempts.iter().map(|a| a.task_id.as_str()).collect::<Vec<_>>(),
            vec!["slow-1", "slow-2", "slow-3"]
        );
        for (attempt, timeout) in run.attempts.iter().zip(["10ms", "15ms", "23ms"]) {
            assert_eq!(attempt.outcome.reason, Some(FailureReason::Timeout));
            assert!(attempt.outcome.error.as_deref().unwrap().contains(timeout));
        }
        assert_eq!(run.attempts[1].rule_id.as_deref(), Some("extend-timeout"));
        assert_eq!(driver.calls_for("wait_for_selector").len(), 3);

        let rule = runner.engine().rules().get("extend-timeout").unwrap();
        assert_eq!(rule.metadata.failure_count, 2);
    }

    #[tokio::test]
    async fn test_precondition_failure_is_not_learned_from() {
        let driver = Arc::new(ScriptedDriver::new());
        let runner = runner(driver, RunnerConfig::default());
        let task = submit_task().with_precondition(
            adaptive_core_types::Precondition::AuthRequired { selector: None },
        );

        let run = runner.run_task(&task).await;
        assert_eq!(run.attempts.len(), 1);
        assert_eq!(run.attempts[0].outcome.status, OutcomeStatus::Aborted);
        assert_eq!(run.attempts[0].learning.as_deref(), Some("no-match"));
    }

    #[tokio::test]
    async fn test_run_all_counts() {
        let driver = Arc::new(ScriptedDriver::new().with_visible(["#ok"]));
        let mut config = RunnerConfig::default();
        config.learning.max_follow_ups = 0;
        let runner = runner(driver, config);

        let tasks = vec![
            RuntimeTask::new("a1", "ok").with_step(Step::click("#ok")),
            RuntimeTask::new("b1", "missing").with_step(Step::click("#missing")),
        ];
        let report = runner.run_all(&tasks).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.all_succeeded());
        assert!(report.finished_at >= report.started_at);
    }
}
