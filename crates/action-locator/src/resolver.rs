//! Smart actions with confidence-ordered fallback

use crate::{errors::LocatorError, strategies::strategies_for_target, types::*};
use async_trait::async_trait;
use browser_driver::{
    BrowserDriver, ClickOptions, SharedDriver, TypeOptions, WaitOptions, WaitState,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Element locator trait
#[async_trait]
pub trait ElementLocator: Send + Sync {
    /// Click the first strategy that works, retrying full passes
    async fn locate_and_click(&self, target: &ElementTarget) -> Result<Resolution, LocatorError>;

    /// Type into the first strategy that works (single pass)
    async fn locate_and_type(
        &self,
        target: &ElementTarget,
        value: &str,
    ) -> Result<Resolution, LocatorError>;

    /// Wait for the first sufficiently confident strategy to become visible (single pass)
    async fn locate_and_wait(
        &self,
        target: &ElementTarget,
        timeout_ms: Option<u64>,
    ) -> Result<Resolution, LocatorError>;
}

/// Default locator over a browser driver
pub struct SmartLocator {
    driver: SharedDriver,
    config: LocatorConfig,
}

#[derive(Clone, Copy)]
enum SmartAction<'a> {
    Click,
    Type(&'a str),
    Wait(u64),
}

impl SmartAction<'_> {
    fn name(&self) -> &'static str {
        match self {
            SmartAction::Click => "click",
            SmartAction::Type(_) => "type",
            SmartAction::Wait(_) => "wait",
        }
    }
}

impl SmartLocator {
    pub fn new(driver: SharedDriver) -> Self {
        Self::with_config(driver, LocatorConfig::default())
    }

    pub fn with_config(driver: SharedDriver, config: LocatorConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Click; `true` when any strategy succeeded
    pub async fn smart_click(&self, target: impl Into<ElementTarget>) -> bool {
        self.locate_and_click(&target.into()).await.is_ok()
    }

    /// Type; `true` when any strategy succeeded
    pub async fn smart_type(&self, target: impl Into<ElementTarget>, value: &str) -> bool {
        self.locate_and_type(&target.into(), value).await.is_ok()
    }

    /// Wait for visibility; `true` when any strategy succeeded
    pub async fn smart_wait(&self, target: impl Into<ElementTarget>, timeout_ms: Option<u64>) -> bool {
        self.locate_and_wait(&target.into(), timeout_ms).await.is_ok()
    }

    /// One pass over `strategies`; returns the winning strategy or the last error
    async fn single_pass(
        &self,
        strategies: &[SelectorStrategy],
        action: SmartAction<'_>,
        attempts: &mut usize,
    ) -> Result<SelectorStrategy, Option<LocatorError>> {
        let mut last_error = None;
        for strategy in strategies {
            *attempts += 1;
            let result = match action {
                SmartAction::Click => {
                    self.driver
                        .click(&strategy.selector, ClickOptions::default())
                        .await
                }
                SmartAction::Type(value) => {
                    self.driver
                        .type_text(&strategy.selector, value, TypeOptions::default())
                        .await
                }
                SmartAction::Wait(timeout_ms) => {
                    self.driver
                        .wait_for_selector(
                            &strategy.selector,
                            WaitOptions::new(Some(timeout_ms), Some(WaitState::Visible)),
                        )
                        .await
                }
            };

            match result {
                Ok(()) => return Ok(strategy.clone()),
                Err(err) => {
                    debug!(
                        action = action.name(),
                        strategy = %strategy.kind,
                        selector = %strategy.selector,
                        error = %err,
                        "strategy failed"
                    );
                    last_error = Some(LocatorError::Driver(err));
                }
            }
        }
        Err(last_error)
    }

    async fn run(
        &self,
        target: &ElementTarget,
        action: SmartAction<'_>,
        passes: u32,
    ) -> Result<Resolution, LocatorError> {
        let mut strategies = strategies_for_target(target);
        if let SmartAction::Wait(_) = action {
            strategies.retain(|s| s.confidence >= self.config.min_wait_confidence);
        }
        if strategies.is_empty() {
            return Err(LocatorError::NoStrategies(target.to_string()));
        }

        let passes = passes.max(1);
        let mut attempts = 0;
        for pass in 1..=passes {
            match self.single_pass(&strategies, action, &mut attempts).await {
                Ok(strategy) => {
                    info!(
                        action = action.name(),
                        target = %target,
                        selector = %strategy.selector,
                        confidence = strategy.confidence,
                        attempts,
                        "smart action resolved"
                    );
                    return Ok(Resolution { strategy, attempts });
                }
                Err(_) if pass < passes => {
                    debug!(pass, passes, "strategy pass exhausted, retrying");
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(_) => {}
            }
        }

        warn!(action = action.name(), target = %target, attempts, "all strategies failed");
        Err(LocatorError::Exhausted {
            target: target.to_string(),
            attempts,
        })
    }
}

#[async_trait]
impl ElementLocator for SmartLocator {
    async fn locate_and_click(&self, target: &ElementTarget) -> Result<Resolution, LocatorError> {
        self.run(target, SmartAction::Click, self.config.max_retries)
            .await
    }

    async fn locate_and_type(
        &self,
        target: &ElementTarget,
        value: &str,
    ) -> Result<Resolution, LocatorError> {
        self.run(target, SmartAction::Type(value), 1).await
    }

    async fn locate_and_wait(
        &self,
        target: &ElementTarget,
        timeout_ms: Option<u64>,
    ) -> Result<Resolution, LocatorError> {
        let timeout_ms = timeout_ms.unwrap_or(self.config.wait_timeout_ms);
        self.run(target, SmartAction::Wait(timeout_ms), 1).await
    }
}
