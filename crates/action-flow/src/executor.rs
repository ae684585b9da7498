//! Task executor implementation

use crate::classify::classify_failure;
use crate::errors::FlowError;
use crate::types::ExecutorConfig;
use action_gate::GateValidator;
use action_locator::{ElementLocator, ElementTarget};
use adaptive_core_types::{Outcome, RuntimeTask, Step, StepAction};
use async_trait::async_trait;
use browser_driver::{
    BrowserDriver, ClickOptions, DriverError, SharedDriver, TypeOptions, WaitOptions,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Task executor trait
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run one task to exactly one outcome; never fails outward
    async fn execute(&self, task: &RuntimeTask) -> Outcome;
}

/// Default task executor implementation
pub struct DefaultTaskExecutor {
    driver: SharedDriver,
    gate: Arc<dyn GateValidator>,
    locator: Option<Arc<dyn ElementLocator>>,
    config: ExecutorConfig,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl DefaultTaskExecutor {
    /// Create a new task executor
    pub fn new(driver: SharedDriver, gate: Arc<dyn GateValidator>) -> Self {
        Self {
            driver,
            gate,
            locator: None,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Locator used for selector fallback when `smart_selectors` is on
    pub fn with_locator(mut self, locator: Arc<dyn ElementLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Dispatch one step to the driver
    async fn run_step(&self, step: &Step) -> Result<(), FlowError> {
        match &step.action {
            StepAction::Navigate { url, wait_until } => {
                self.driver.navigate(url, *wait_until).await?;
            }
            StepAction::Click { selector, timeout } => {
                let result = self
                    .driver
                    .click(selector, ClickOptions::with_timeout(*timeout))
                    .await;
                self.fallback(result, selector, |locator, target| async move {
                    locator.locate_and_click(&target).await.map(|_| ())
                })
                .await?;
            }
            StepAction::Wait {
                selector: Some(selector),
                timeout,
                state,
            } => {
                let result = self
                    .driver
                    .wait_for_selector(selector, WaitOptions::new(*timeout, *state))
                    .await;
                let timeout = *timeout;
                self.fallback(result, selector, |locator, target| async move {
                    locator.locate_and_wait(&target, timeout).await.map(|_| ())
                })
                .await?;
            }
            StepAction::Wait {
                selector: None,
                timeout,
                ..
            } => {
                let pause = timeout.unwrap_or(self.config.default_wait_ms);
                tokio::time::sleep(Duration::from_millis(pause)).await;
            }
            StepAction::Type {
                selector,
                value,
                delay,
            } => {
                let result = self
                    .driver
                    .type_text(selector, value, TypeOptions::with_delay(*delay))
                    .await;
                let value = value.clone();
                self.fallback(result, selector, |locator, target| async move {
                    locator.locate_and_type(&target, &value).await.map(|_| ())
                })
                .await?;
            }
            StepAction::Evaluate { script, args } => {
                let args = args.as_deref().unwrap_or_default();
                let value = self.driver.evaluate(script, args).await?;
                debug!(result = %value, "evaluate step returned");
            }
            StepAction::Select { selector, value } => {
                self.driver.select(selector, value).await?;
            }
            StepAction::Hover { selector } => {
                self.driver.hover(selector).await?;
            }
            StepAction::Unknown => return Err(FlowError::UnknownStep),
        }
        Ok(())
    }

    /// On a driver error, retry through the locator when selector fallback is enabled
    async fn fallback<F, Fut>(
        &self,
        result: Result<(), DriverError>,
        selector: &str,
        retry: F,
    ) -> Result<(), FlowError>
    where
        F: FnOnce(Arc<dyn ElementLocator>, ElementTarget) -> Fut,
        Fut: std::future::Future<Output = Result<(), action_locator::LocatorError>>,
    {
        let err = match result {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        let locator = match (&self.locator, self.config.smart_selectors) {
            (Some(locator), true) => locator.clone(),
            _ => return Err(err.into()),
        };

        debug!(selector, error = %err, "direct selector failed, trying strategies");
        match retry(locator, ElementTarget::selector(selector)).await {
            Ok(()) => Ok(()),
            Err(fallback_err) => {
                debug!(selector, error = %fallback_err, "strategy fallback failed");
                Err(err.into())
            }
        }
    }

    async fn capture(&self, task: &RuntimeTask, label: &str) -> Option<String> {
        if !self.config.capture_screenshots {
            return None;
        }
        match self.driver.screenshot(&format!("{}-{label}", task.id)).await {
            Ok(reference) => reference,
            Err(err) => {
                warn!(task_id = %task.id, error = %err, "screenshot capture failed");
                None
            }
        }
    }
}

#[async_trait]
impl TaskExecutor for DefaultTaskExecutor {
    async fn execute(&self, task: &RuntimeTask) -> Outcome {
        let start = Instant::now();
        info!(task_id = %task.id, intent = %task.intent, steps = task.steps.len(), "executing task");

        for precondition in &task.preconditions {
            let failure = match self.gate.check_precondition(precondition).await {
                Ok(result) if result.passed => continue,
                Ok(result) => result.summary(),
                Err(err) => format!("{}: {err}", precondition.kind()),
            };
            warn!(task_id = %task.id, precondition = precondition.kind(), "precondition failed");
            let screenshot = self.capture(task, "precondition").await;
            return Outcome::precondition_failure(
                format!("Precondition not met: {failure}"),
                elapsed_ms(start),
            )
            .with_screenshot(screenshot);
        }

        for (index, step) in task.steps.iter().enumerate() {
            debug!(task_id = %task.id, index, step = step.kind(), "running step");
            if let Err(err) = self.run_step(step).await {
                let message = err.to_string();
                if step.optional {
                    warn!(task_id = %task.id, index, error = %message, "optional step failed, continuing");
                    continue;
                }

                let reason = classify_failure(&message);
                warn!(
                    task_id = %task.id,
                    index,
                    step = step.kind(),
                    reason = %reason,
                    error = %message,
                    "step failed"
                );
                let screenshot = self.capture(task, &format!("step-{index}")).await;
                return Outcome::step_failure(index, reason, message, elapsed_ms(start))
                    .with_screenshot(screenshot);
            }
        }

        for signal in &task.signals {
            let failure = match self.gate.check_signal(signal).await {
                Ok(result) if result.passed => continue,
                Ok(result) => result.summary(),
                Err(err) => format!("{}: {err}", signal.kind()),
            };
            warn!(task_id = %task.id, signal = signal.kind(), "signal not met");
            let screenshot = self.capture(task, "signal").await;
            return Outcome::signal_failure(format!("Signal not met: {failure}"), elapsed_ms(start))
                .with_screenshot(screenshot);
        }

        let duration = elapsed_ms(start);
        info!(task_id = %task.id, duration_ms = duration, "task succeeded");
        Outcome::success(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_gate::{DriverGateValidator, GateConfig};
    use action_locator::{LocatorConfig, SmartLocator};
    use adaptive_core_types::{FailureReason, OutcomeStatus, Precondition, Signal};
    use browser_driver::ScriptedDriver;
    use serde_json::json;

    fn executor(driver: &Arc<ScriptedDriver>) -> DefaultTaskExecutor {
        let gate = DriverGateValidator::with_config(
            driver.clone(),
            GateConfig {
                signal_timeout_ms: 10,
                poll_interval_ms: 1,
                ..GateConfig::default()
            },
        );
        DefaultTaskExecutor::new(driver.clone(), Arc::new(gate))
    }

    #[tokio::test]
    async fn test_empty_task_succeeds() {
        let driver = Arc::new(ScriptedDriver::new());
        let outcome = executor(&driver).execute(&RuntimeTask::new("t1", "noop")).await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.failed_step, None);
        assert_eq!(outcome.reason, None);
        assert_eq!(outcome.error, None);
    }

    #[tokio::test]
    async fn test_failing_step_stops_execution() {
        let driver = Arc::new(ScriptedDriver::new().with_visible(["#after"]));
        let task = RuntimeTask::new("t1", "submit form")
            .with_step(Step::navigate("/form"))
            .with_step(Step::click("[data-testid=\"submit\"]"))
            .with_step(Step::click("#after"));

        let outcome = executor(&driver).execute(&task).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.failed_step, Some(1));
        assert_eq!(outcome.reason, Some(FailureReason::SelectorNotFound));
        assert_eq!(
            outcome.error.as_deref(),
            Some("Selector not found: [data-testid=\"submit\"]")
        );
        assert!(driver.calls_for("click").iter().all(|s| s != "#after"));
    }

    #[tokio::test]
    async fn test_optional_step_failure_is_skipped() {
        let driver = Arc::new(ScriptedDriver::new().with_visible(["#next"]));
        let task = RuntimeTask::new("t1", "dismiss banner then continue")
            .with_step(Step::click("#cookie-banner").optional())
            .with_step(Step::click("#next"));

        let outcome = executor(&driver).execute(&task).await;
        assert!(outcome.is_success());
        assert_eq!(driver.calls_for("click"), vec!["#cookie-banner", "#next"]);
    }

    #[tokio::test]
    async fn test_unknown_step_type_fails() {
        let driver = Arc::new(ScriptedDriver::new());
        let task = RuntimeTask::new("t1", "mystery").with_step(Step::new(StepAction::Unknown));

        let outcome = executor(&driver).execute(&task).await;
        assert_eq!(outcome.failed_step, Some(0));
        assert_eq!(outcome.error.as_deref(), Some("Unknown step type"));
        assert_eq!(outcome.reason, Some(FailureReason::SelectorNotFound));
    }

    #[tokio::test]
    async fn test_precondition_failure_runs_no_steps() {
        let driver = Arc::new(ScriptedDriver::new().with_visible(["#go"]));
        let task = RuntimeTask::new("t1", "needs login")
            .with_precondition(Precondition::AuthRequired { selector: None })
            .with_step(Step::click("#go"));

        let outcome = executor(&driver).execute(&task).await;
        assert_eq!(outcome.status, OutcomeStatus::Aborted);
        assert_eq!(outcome.reason, Some(FailureReason::PreconditionFailed));
        assert_eq!(outcome.failed_step, None);
        assert!(driver.calls_for("click").is_empty());
    }

    #[tokio::test]
    async fn test_signal_failure_after_steps() {
        let driver = Arc::new(ScriptedDriver::new().with_visible(["#save"]));
        let task = RuntimeTask::new("t1", "save")
            .with_step(Step::click("#save"))
            .with_signal(Signal::DomVisible {
                selector: "#saved-toast".into(),
                timeout: None,
            });

        let outcome = executor(&driver).execute(&task).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.reason, Some(FailureReason::SignalNotMet));
        assert_eq!(outcome.failed_step, None);

        driver.show("#saved-toast");
        assert!(executor(&driver).execute(&task).await.is_success());
    }

    #[tokio::test]
    async fn test_unknown_signal_fails_closed() {
        let driver = Arc::new(ScriptedDriver::new());
        let task = RuntimeTask::new("t1", "odd signal").with_signal(Signal::Unknown);
        let outcome = executor(&driver).execute(&task).await;
        assert_eq!(outcome.reason, Some(FailureReason::SignalNotMet));
    }

    #[tokio::test]
    async fn test_step_kinds_dispatch() {
        let driver = Arc::new(
            ScriptedDriver::new().with_visible(["#email", "#country", "#menu", "#panel"]),
        );
        let task = RuntimeTask::new("t1", "fill profile")
            .with_step(Step::type_text("#email", "a@example.com"))
            .with_step(Step::select("#country", "nl"))
            .with_step(Step::hover("#menu"))
            .with_step(Step::wait_for("#panel"))
            .with_step(Step::evaluate("window.scrollTo(0, 0)"))
            .with_step(Step::new(StepAction::Wait {
                selector: None,
                timeout: Some(1),
                state: None,
            }))
            .with_signal(Signal::StateMatch {
                selector: "profile.saved".into(),
                value: json!(true),
            });
        driver.set_state(json!({"profile": {"saved": true}}));

        let outcome = executor(&driver).execute(&task).await;
        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(driver.typed_value("#email").as_deref(), Some("a@example.com"));
        assert_eq!(driver.selected_value("#country").as_deref(), Some("nl"));
        assert_eq!(driver.calls_for("hover"), vec!["#menu"]);
        assert_eq!(driver.calls_for("evaluate")[0], "window.scrollTo(0, 0)");
    }

    #[tokio::test]
    async fn test_navigation_failure_is_classified() {
        let driver = Arc::new(ScriptedDriver::new());
        driver.fail_on("/broken", "net::ERR_CONNECTION_REFUSED");
        let task = RuntimeTask::new("t1", "open").with_step(Step::navigate("/broken"));

        let outcome = executor(&driver).execute(&task).await;
        assert_eq!(outcome.reason, Some(FailureReason::NavigationFailed));
    }

    #[tokio::test]
    async fn test_screenshot_attached_on_failure() {
        let driver = Arc::new(ScriptedDriver::new());
        let task = RuntimeTask::new("t7", "click").with_step(Step::click("#nope"));
        let executor = executor(&driver).with_config(ExecutorConfig {
            capture_screenshots: true,
            ..ExecutorConfig::default()
        });

        let outcome = executor.execute(&task).await;
        assert_eq!(
            outcome.screenshot.as_deref(),
            Some("scripted://screenshots/t7-step-0.png")
        );
    }

    #[tokio::test]
    async fn test_smart_selectors_recover_click() {
        let driver = Arc::new(ScriptedDriver::new().with_visible(["#checkout"]));
        let locator = SmartLocator::with_config(
            driver.clone(),
            LocatorConfig {
                retry_delay_ms: 1,
                ..LocatorConfig::default()
            },
        );
        let executor = executor(&driver)
            .with_config(ExecutorConfig {
                smart_selectors: true,
                ..ExecutorConfig::default()
            })
            .with_locator(Arc::new(locator));

        let task = RuntimeTask::new("t1", "checkout").with_step(Step::click("button#checkout.btn"));
        let outcome = executor.execute(&task).await;
        assert!(outcome.is_success(), "{outcome:?}");
        assert!(driver.calls_for("click").contains(&"#checkout".to_string()));
    }
}
