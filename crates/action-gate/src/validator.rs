//! Gate validator over a browser driver

use crate::{conditions::*, errors::GateError, types::*};
use adaptive_core_types::{Precondition, Signal};
use async_trait::async_trait;
use browser_driver::{is_truthy, scripts, BrowserDriver, SharedDriver};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Gate validator trait
#[async_trait]
pub trait GateValidator: Send + Sync {
    /// Evaluate one precondition
    async fn check_precondition(&self, precondition: &Precondition)
        -> Result<GateResult, GateError>;

    /// Evaluate one success signal
    async fn check_signal(&self, signal: &Signal) -> Result<GateResult, GateError>;
}

/// Default gate validator implementation
pub struct DriverGateValidator {
    driver: SharedDriver,
    config: GateConfig,
}

impl DriverGateValidator {
    pub fn new(driver: SharedDriver) -> Self {
        Self::with_config(driver, GateConfig::default())
    }

    pub fn with_config(driver: SharedDriver, config: GateConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    async fn evaluate_truthy(&self, script: &str, args: &[Value]) -> Result<bool, GateError> {
        let value = self.driver.evaluate(script, args).await?;
        Ok(is_truthy(&value))
    }

    /// Re-evaluate until truthy or the timeout passes
    async fn poll_truthy(
        &self,
        script: &str,
        args: &[Value],
        timeout_ms: u64,
    ) -> Result<bool, GateError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.evaluate_truthy(script, args).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    async fn precondition_holds(&self, precondition: &Precondition) -> Result<bool, GateError> {
        match precondition {
            Precondition::AuthRequired { selector } => match selector {
                Some(selector) => Ok(self.driver.is_visible(selector, None).await?),
                None => self.evaluate_truthy(scripts::AUTH_PROBE, &[]).await,
            },
            Precondition::DataReady { selector, timeout } => match selector {
                Some(selector) => Ok(self.driver.is_visible(selector, *timeout).await?),
                None => self.evaluate_truthy(scripts::DOCUMENT_READY, &[]).await,
            },
            Precondition::ServiceAvailable { url } => {
                let url = url.as_deref().unwrap_or("/");
                self.evaluate_truthy(scripts::SERVICE_PROBE, &[Value::String(url.to_string())])
                    .await
            }
            Precondition::Unknown => Ok(false),
        }
    }

    async fn signal_met(&self, signal: &Signal) -> Result<bool, GateError> {
        let default_timeout = self.config.signal_timeout_ms;
        match signal {
            Signal::DomVisible { selector, timeout } => Ok(self
                .driver
                .is_visible(selector, Some(timeout.unwrap_or(default_timeout)))
                .await?),
            Signal::DomHidden { selector, timeout } => Ok(!self
                .driver
                .is_visible(selector, Some(timeout.unwrap_or(default_timeout)))
                .await?),
            Signal::RouteMatch { value } => {
                let actual = self.driver.evaluate(scripts::LOCATION_PATHNAME, &[]).await?;
                let matched = route_matches(&actual, value);
                if !matched {
                    debug!(expected = %value, actual = %actual, "route mismatch");
                }
                Ok(matched)
            }
            Signal::NetworkIdle { timeout } => {
                // a driver timeout here is an unmet signal, not an error
                match self
                    .driver
                    .wait_for_network_idle(Some(timeout.unwrap_or(default_timeout)))
                    .await
                {
                    Ok(()) => Ok(true),
                    Err(err) => {
                        debug!(error = %err, "network did not go idle");
                        Ok(false)
                    }
                }
            }
            Signal::NoErrorToast { selector } => {
                let selector = selector
                    .as_deref()
                    .unwrap_or(self.config.error_toast_selector.as_str());
                Ok(!self.driver.query_selector(selector).await?)
            }
            Signal::ApiSuccess { value, timeout } => {
                let args = [Value::String(value.clone().unwrap_or_default())];
                match timeout {
                    Some(timeout) => {
                        self.poll_truthy(scripts::API_SUCCESS_PROBE, &args, *timeout)
                            .await
                    }
                    None => self.evaluate_truthy(scripts::API_SUCCESS_PROBE, &args).await,
                }
            }
            Signal::StateMatch { selector, value } => {
                if selector.trim().is_empty() {
                    return Err(GateError::InvalidCheck(
                        "state-match requires a state key".to_string(),
                    ));
                }
                let actual = self
                    .driver
                    .evaluate(scripts::STATE_LOOKUP, &[Value::String(selector.clone())])
                    .await?;
                Ok(state_matches(&actual, value))
            }
            Signal::Unknown => {
                warn!("unknown signal type treated as unmet");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl GateValidator for DriverGateValidator {
    async fn check_precondition(
        &self,
        precondition: &Precondition,
    ) -> Result<GateResult, GateError> {
        let start = Instant::now();
        let holds = self.precondition_holds(precondition).await?;
        debug!(precondition = precondition.kind(), holds, "precondition checked");
        Ok(
            GateResult::from_bool(precondition.kind(), holds, describe_precondition(precondition))
                .with_latency(start.elapsed().as_millis() as u64),
        )
    }

    async fn check_signal(&self, signal: &Signal) -> Result<GateResult, GateError> {
        let start = Instant::now();
        let met = self.signal_met(signal).await?;
        debug!(signal = signal.kind(), met, "signal checked");
        Ok(GateResult::from_bool(signal.kind(), met, describe_signal(signal))
            .with_latency(start.elapsed().as_millis() as u64))
    }
}
