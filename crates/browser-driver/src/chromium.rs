//! Chromium-backed driver built on chromiumoxide

use crate::driver::{is_truthy, BrowserDriver};
use crate::errors::DriverError;
use crate::scripts;
use crate::types::{
    ClickOptions, TypeOptions, WaitOptions, WaitState, WaitUntil, DEFAULT_ACTION_TIMEOUT_MS,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const IDLE_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Launch settings for [`ChromiumDriver`]
#[derive(Debug, Clone, Default)]
pub struct ChromiumConfig {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    /// Base for relative navigation targets
    pub base_url: Option<String>,
    /// Screenshots are written here when set
    pub screenshot_dir: Option<PathBuf>,
}

pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    config: ChromiumConfig,
}

fn backend(err: CdpError) -> DriverError {
    DriverError::Backend(err.to_string())
}

impl ChromiumDriver {
    /// Launch a browser and open a blank page
    pub async fn launch(config: ChromiumConfig) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }
        let browser_config = builder.build().map_err(DriverError::Backend)?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(backend)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    warn!(error = %err, "chromium handler error");
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(backend)?;
        info!(headless = config.headless, "chromium driver launched");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            config,
        })
    }

    pub async fn shutdown(self) -> Result<(), DriverError> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(backend)?;
        self.handler.abort();
        Ok(())
    }

    fn resolve_url(&self, target: &str) -> Result<String, DriverError> {
        match Url::parse(target) {
            Ok(url) => Ok(url.to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.config.base_url.as_deref().ok_or_else(|| {
                    DriverError::Navigation(format!("relative URL {target} without base URL"))
                })?;
                Url::parse(base)
                    .and_then(|base| base.join(target))
                    .map(|url| url.to_string())
                    .map_err(|err| DriverError::Navigation(format!("{target}: {err}")))
            }
            Err(err) => Err(DriverError::Navigation(format!("{target}: {err}"))),
        }
    }

    async fn probe(&self, script: &str, selector: &str) -> Result<bool, DriverError> {
        let value = self
            .evaluate(script, &[Value::String(selector.to_string())])
            .await?;
        Ok(is_truthy(&value))
    }

    /// Poll `script(selector)` until it matches `expected` or the timeout passes
    async fn poll_probe(
        &self,
        script: &str,
        selector: &str,
        expected: bool,
        timeout_ms: u64,
    ) -> Result<bool, DriverError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.probe(script, selector).await? == expected {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn interactable(&self, selector: &str, timeout_ms: u64) -> Result<(), DriverError> {
        if self
            .poll_probe(scripts::VISIBILITY_PROBE, selector, true, timeout_ms)
            .await?
        {
            return Ok(());
        }
        if self.probe(scripts::QUERY_PROBE, selector).await? {
            Err(DriverError::NotInteractable(selector.to_string()))
        } else {
            Err(DriverError::ElementNotFound(selector.to_string()))
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str, wait_until: Option<WaitUntil>) -> Result<(), DriverError> {
        let target = self.resolve_url(url)?;
        debug!(url = %target, "navigating");
        self.page
            .goto(target.as_str())
            .await
            .map_err(|err| DriverError::Navigation(format!("{target}: {err}")))?;

        match wait_until {
            Some(WaitUntil::NetworkIdle) => self.wait_for_network_idle(None).await,
            _ => Ok(()),
        }
    }

    async fn click(&self, selector: &str, options: ClickOptions) -> Result<(), DriverError> {
        let timeout_ms = options.timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS);
        self.interactable(selector, timeout_ms).await?;
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;
        element.click().await.map_err(backend)?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        options: WaitOptions,
    ) -> Result<(), DriverError> {
        let state = options.state_or_default();
        let (script, expected) = match state {
            WaitState::Visible => (scripts::VISIBILITY_PROBE, true),
            WaitState::Hidden => (scripts::VISIBILITY_PROBE, false),
            WaitState::Attached => (scripts::QUERY_PROBE, true),
            WaitState::Detached => (scripts::QUERY_PROBE, false),
        };
        let timeout_ms = options.timeout_or_default();
        if self
            .poll_probe(script, selector, expected, timeout_ms)
            .await?
        {
            Ok(())
        } else {
            Err(DriverError::timeout(
                format!("waiting for `{selector}` to be {}", state.as_str()),
                timeout_ms,
            ))
        }
    }

    async fn type_text(
        &self,
        selector: &str,
        value: &str,
        options: TypeOptions,
    ) -> Result<(), DriverError> {
        self.interactable(selector, DEFAULT_ACTION_TIMEOUT_MS).await?;
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;
        element.click().await.map_err(backend)?;

        match options.delay_ms {
            Some(delay) if delay > 0 => {
                for ch in value.chars() {
                    element
                        .type_str(ch.to_string())
                        .await
                        .map_err(backend)?;
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
            _ => {
                element.type_str(value).await.map_err(backend)?;
            }
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str, args: &[Value]) -> Result<Value, DriverError> {
        let expression = if args.is_empty() {
            script.to_string()
        } else {
            let rendered = args
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("({script})({rendered})")
        };

        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|err| DriverError::Script(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn select(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.interactable(selector, DEFAULT_ACTION_TIMEOUT_MS).await?;
        self.evaluate(
            scripts::SELECT_OPTION,
            &[
                Value::String(selector.to_string()),
                Value::String(value.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), DriverError> {
        self.interactable(selector, DEFAULT_ACTION_TIMEOUT_MS).await?;
        self.evaluate(
            scripts::HOVER_ELEMENT,
            &[Value::String(selector.to_string())],
        )
        .await?;
        Ok(())
    }

    async fn is_visible(
        &self,
        selector: &str,
        timeout_ms: Option<u64>,
    ) -> Result<bool, DriverError> {
        match timeout_ms {
            Some(timeout_ms) => {
                self.poll_probe(scripts::VISIBILITY_PROBE, selector, true, timeout_ms)
                    .await
            }
            None => self.probe(scripts::VISIBILITY_PROBE, selector).await,
        }
    }

    async fn query_selector(&self, selector: &str) -> Result<bool, DriverError> {
        self.probe(scripts::QUERY_PROBE, selector).await
    }

    async fn wait_for_network_idle(&self, timeout_ms: Option<u64>) -> Result<(), DriverError> {
        let timeout_ms = timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut last_count = Value::Null;
        let mut quiet_since = Instant::now();

        loop {
            let ready = is_truthy(&self.evaluate(scripts::DOCUMENT_READY, &[]).await?);
            let count = self.evaluate(scripts::RESOURCE_COUNT, &[]).await?;
            if count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            } else if ready && quiet_since.elapsed() >= IDLE_QUIET_PERIOD {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::timeout("waiting for network idle", timeout_ms));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn screenshot(&self, label: &str) -> Result<Option<String>, DriverError> {
        let Some(dir) = &self.config.screenshot_dir else {
            return Ok(None);
        };
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|err| DriverError::Backend(err.to_string()))?;
        let path = dir.join(format!("{label}.png"));
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), &path)
            .await
            .map_err(backend)?;
        Ok(Some(path.display().to_string()))
    }
}
