//! Deterministic scripted page
//!
//! `ScriptedDriver` keeps a small in-memory model of a page: which selectors are
//! visible or merely attached, the current URL, injected application state and
//! canned script results. Operations resolve immediately against that model and
//! every call is journaled, so tests can assert exactly what ran.

use crate::driver::BrowserDriver;
use crate::errors::DriverError;
use crate::scripts;
use crate::types::{
    ClickOptions, TypeOptions, WaitOptions, WaitState, WaitUntil, DEFAULT_ACTION_TIMEOUT_MS,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost/";

/// Serializable description of a scripted page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFixture {
    /// Base for relative navigation targets
    pub base_url: String,

    /// Initial URL
    pub url: Option<String>,

    /// Selectors that are attached and visible
    pub visible: Vec<String>,

    /// Selectors that are attached but hidden
    pub hidden: Vec<String>,

    /// Canned results keyed by the exact script text
    pub evaluations: HashMap<String, Value>,

    /// Permanent failures keyed by selector, script or URL
    pub failures: HashMap<String, String>,

    pub network_idle: bool,

    pub authenticated: bool,

    /// Service URLs the health probe reports as down
    pub unavailable_services: Vec<String>,

    /// Value exposed as `window.__APP_STATE__`
    pub state: Value,

    /// Finished requests visible to the API probe
    pub api_calls: Vec<ApiCall>,

    /// Page states swapped in after navigating to a path
    pub routes: HashMap<String, RouteFixture>,
}

impl Default for PageFixture {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            url: None,
            visible: Vec::new(),
            hidden: Vec::new(),
            evaluations: HashMap::new(),
            failures: HashMap::new(),
            network_idle: true,
            authenticated: false,
            unavailable_services: Vec::new(),
            state: Value::Null,
            api_calls: Vec::new(),
            routes: HashMap::new(),
        }
    }
}

/// Page state for a route
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteFixture {
    pub visible: Vec<String>,
    pub hidden: Vec<String>,

    /// Land on this path instead of the requested one
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCall {
    pub url: String,
    pub status: u16,
}

/// One journaled driver operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCall {
    pub operation: &'static str,
    pub target: String,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    message: String,
    /// `None` fails forever
    remaining: Option<u32>,
}

#[derive(Debug)]
struct ScriptState {
    base_url: String,
    current_url: String,
    visible: HashSet<String>,
    hidden: HashSet<String>,
    evaluations: HashMap<String, Value>,
    failures: HashMap<String, InjectedFailure>,
    network_idle: bool,
    authenticated: bool,
    unavailable_services: HashSet<String>,
    state: Value,
    api_calls: Vec<ApiCall>,
    routes: HashMap<String, RouteFixture>,
    typed: HashMap<String, String>,
    selected: HashMap<String, String>,
    calls: Vec<DriverCall>,
}

impl ScriptState {
    fn record(&mut self, operation: &'static str, target: &str) {
        debug!(operation, target, "scripted driver call");
        self.calls.push(DriverCall {
            operation,
            target: target.to_string(),
        });
    }

    fn take_failure(&mut self, target: &str) -> Option<String> {
        let failure = self.failures.get_mut(target)?;
        let message = failure.message.clone();
        let remaining = failure.remaining;
        match remaining {
            Some(n) if n <= 1 => {
                self.failures.remove(target);
            }
            Some(n) => failure.remaining = Some(n - 1),
            None => {}
        }
        Some(message)
    }

    fn is_attached(&self, selector: &str) -> bool {
        self.visible.contains(selector) || self.hidden.contains(selector)
    }

    fn require_interactable(&self, selector: &str) -> Result<(), DriverError> {
        if self.visible.contains(selector) {
            Ok(())
        } else if self.hidden.contains(selector) {
            Err(DriverError::NotInteractable(selector.to_string()))
        } else {
            Err(DriverError::ElementNotFound(selector.to_string()))
        }
    }

    fn resolve_url(&self, target: &str) -> Result<Url, DriverError> {
        match Url::parse(target) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&self.base_url)
                .and_then(|base| base.join(target))
                .map_err(|err| DriverError::Navigation(format!("{target}: {err}"))),
            Err(err) => Err(DriverError::Navigation(format!("{target}: {err}"))),
        }
    }

    fn current_path(&self) -> String {
        Url::parse(&self.current_url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    fn lookup_state(&self, key: &str) -> Value {
        key.split('.')
            .try_fold(&self.state, |acc, part| match acc {
                Value::Object(map) => map.get(part),
                Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn builtin_evaluation(&self, script: &str, args: &[Value]) -> Value {
        let first_arg = args.first().and_then(Value::as_str).unwrap_or_default();
        match script {
            scripts::LOCATION_PATHNAME => Value::String(self.current_path()),
            scripts::DOCUMENT_READY => Value::Bool(true),
            scripts::AUTH_PROBE => Value::Bool(self.authenticated),
            scripts::SERVICE_PROBE => Value::Bool(!self.unavailable_services.contains(first_arg)),
            scripts::STATE_LOOKUP => self.lookup_state(first_arg),
            scripts::API_SUCCESS_PROBE => Value::Bool(self.api_calls.iter().any(|call| {
                (first_arg.is_empty() || call.url.contains(first_arg))
                    && (200..300).contains(&call.status)
            })),
            scripts::VISIBILITY_PROBE => Value::Bool(self.visible.contains(first_arg)),
            scripts::QUERY_PROBE => Value::Bool(self.is_attached(first_arg)),
            _ => Value::Null,
        }
    }
}

/// Deterministic in-memory [`BrowserDriver`]
#[derive(Debug)]
pub struct ScriptedDriver {
    state: Mutex<ScriptState>,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDriver {
    /// Empty page at the default base URL
    pub fn new() -> Self {
        Self::from_fixture(PageFixture::default())
    }

    pub fn from_fixture(fixture: PageFixture) -> Self {
        let failures = fixture
            .failures
            .into_iter()
            .map(|(target, message)| {
                (
                    target,
                    InjectedFailure {
                        message,
                        remaining: None,
                    },
                )
            })
            .collect();

        let mut state = ScriptState {
            base_url: fixture.base_url.clone(),
            current_url: fixture.base_url,
            visible: fixture.visible.into_iter().collect(),
            hidden: fixture.hidden.into_iter().collect(),
            evaluations: fixture.evaluations,
            failures,
            network_idle: fixture.network_idle,
            authenticated: fixture.authenticated,
            unavailable_services: fixture.unavailable_services.into_iter().collect(),
            state: fixture.state,
            api_calls: fixture.api_calls,
            routes: fixture.routes,
            typed: HashMap::new(),
            selected: HashMap::new(),
            calls: Vec::new(),
        };

        if let Some(initial) = fixture.url {
            if let Ok(url) = state.resolve_url(&initial) {
                state.current_url = url.to_string();
            }
        }

        Self {
            state: Mutex::new(state),
        }
    }

    /// Add visible selectors
    pub fn with_visible<I, S>(self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.state.lock();
            state.visible.extend(selectors.into_iter().map(Into::into));
        }
        self
    }

    /// Add attached-but-hidden selectors
    pub fn with_hidden<I, S>(self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.state.lock();
            state.hidden.extend(selectors.into_iter().map(Into::into));
        }
        self
    }

    pub fn show(&self, selector: impl Into<String>) {
        let selector = selector.into();
        let mut state = self.state.lock();
        state.hidden.remove(&selector);
        state.visible.insert(selector);
    }

    pub fn hide(&self, selector: impl Into<String>) {
        let selector = selector.into();
        let mut state = self.state.lock();
        state.visible.remove(&selector);
        state.hidden.insert(selector);
    }

    pub fn detach(&self, selector: &str) {
        let mut state = self.state.lock();
        state.visible.remove(selector);
        state.hidden.remove(selector);
    }

    /// Every operation on `target` (selector, script or URL) fails with `message`
    pub fn fail_on(&self, target: impl Into<String>, message: impl Into<String>) {
        self.state.lock().failures.insert(
            target.into(),
            InjectedFailure {
                message: message.into(),
                remaining: None,
            },
        );
    }

    /// The next `times` operations on `target` fail with `message`
    pub fn fail_times(&self, target: impl Into<String>, times: u32, message: impl Into<String>) {
        if times == 0 {
            return;
        }
        self.state.lock().failures.insert(
            target.into(),
            InjectedFailure {
                message: message.into(),
                remaining: Some(times),
            },
        );
    }

    pub fn clear_failure(&self, target: &str) {
        self.state.lock().failures.remove(target);
    }

    pub fn set_evaluation(&self, script: impl Into<String>, value: Value) {
        self.state.lock().evaluations.insert(script.into(), value);
    }

    pub fn set_state(&self, value: Value) {
        self.state.lock().state = value;
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.state.lock().authenticated = authenticated;
    }

    pub fn set_network_idle(&self, idle: bool) {
        self.state.lock().network_idle = idle;
    }

    pub fn mark_service_unavailable(&self, url: impl Into<String>) {
        self.state.lock().unavailable_services.insert(url.into());
    }

    pub fn push_api_call(&self, url: impl Into<String>, status: u16) {
        self.state.lock().api_calls.push(ApiCall {
            url: url.into(),
            status,
        });
    }

    pub fn current_url(&self) -> String {
        self.state.lock().current_url.clone()
    }

    pub fn current_path(&self) -> String {
        self.state.lock().current_path()
    }

    pub fn typed_value(&self, selector: &str) -> Option<String> {
        self.state.lock().typed.get(selector).cloned()
    }

    pub fn selected_value(&self, selector: &str) -> Option<String> {
        self.state.lock().selected.get(selector).cloned()
    }

    /// Journal of every operation issued so far
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Targets of every journaled call of one operation
    pub fn calls_for(&self, operation: &str) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .map(|call| call.target.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn navigate(&self, url: &str, wait_until: Option<WaitUntil>) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.record("navigate", url);
        if let Some(message) = state.take_failure(url) {
            return Err(DriverError::Navigation(message));
        }

        let resolved = state.resolve_url(url)?;
        let path = resolved.path().to_string();
        state.current_url = resolved.to_string();

        if let Some(route) = state.routes.get(&path).cloned() {
            state.visible = route.visible.into_iter().collect();
            state.hidden = route.hidden.into_iter().collect();
            if let Some(redirect) = route.redirect {
                let landed = state.resolve_url(&redirect)?;
                debug!(from = %path, to = %landed, "scripted redirect");
                state.current_url = landed.to_string();
            }
        }

        if wait_until == Some(WaitUntil::NetworkIdle) && !state.network_idle {
            return Err(DriverError::timeout(
                format!("waiting for network idle after navigation to {url}"),
                DEFAULT_ACTION_TIMEOUT_MS,
            ));
        }
        Ok(())
    }

    async fn click(&self, selector: &str, _options: ClickOptions) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.record("click", selector);
        if let Some(message) = state.take_failure(selector) {
            return Err(DriverError::Scripted(message));
        }
        state.require_interactable(selector)
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        options: WaitOptions,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.record("wait_for_selector", selector);
        if let Some(message) = state.take_failure(selector) {
            return Err(DriverError::Scripted(message));
        }
        let wanted = options.state_or_default();
        let reached = match wanted {
            WaitState::Visible => state.visible.contains(selector),
            WaitState::Attached => state.is_attached(selector),
            WaitState::Hidden => !state.visible.contains(selector),
            WaitState::Detached => !state.is_attached(selector),
        };
        if reached {
            Ok(())
        } else {
            Err(DriverError::timeout(
                format!("waiting for `{selector}` to be {}", wanted.as_str()),
                options.timeout_or_default(),
            ))
        }
    }

    async fn type_text(
        &self,
        selector: &str,
        value: &str,
        _options: TypeOptions,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.record("type", selector);
        if let Some(message) = state.take_failure(selector) {
            return Err(DriverError::Scripted(message));
        }
        state.require_interactable(selector)?;
        state.typed.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn evaluate(&self, script: &str, args: &[Value]) -> Result<Value, DriverError> {
        let mut state = self.state.lock();
        state.record("evaluate", script);
        if let Some(message) = state.take_failure(script) {
            return Err(DriverError::Script(message));
        }
        if let Some(value) = state.evaluations.get(script) {
            return Ok(value.clone());
        }
        Ok(state.builtin_evaluation(script, args))
    }

    async fn select(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.record("select", selector);
        if let Some(message) = state.take_failure(selector) {
            return Err(DriverError::Scripted(message));
        }
        state.require_interactable(selector)?;
        state
            .selected
            .insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.record("hover", selector);
        if let Some(message) = state.take_failure(selector) {
            return Err(DriverError::Scripted(message));
        }
        state.require_interactable(selector)
    }

    async fn is_visible(
        &self,
        selector: &str,
        _timeout_ms: Option<u64>,
    ) -> Result<bool, DriverError> {
        let mut state = self.state.lock();
        state.record("is_visible", selector);
        if let Some(message) = state.take_failure(selector) {
            return Err(DriverError::Scripted(message));
        }
        Ok(state.visible.contains(selector))
    }

    async fn query_selector(&self, selector: &str) -> Result<bool, DriverError> {
        let mut state = self.state.lock();
        state.record("query_selector", selector);
        if let Some(message) = state.take_failure(selector) {
            return Err(DriverError::Scripted(message));
        }
        Ok(state.is_attached(selector))
    }

    async fn wait_for_network_idle(&self, timeout_ms: Option<u64>) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.record("wait_for_network_idle", "");
        if state.network_idle {
            Ok(())
        } else {
            Err(DriverError::timeout(
                "waiting for network idle",
                timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS),
            ))
        }
    }

    async fn screenshot(&self, label: &str) -> Result<Option<String>, DriverError> {
        let mut state = self.state.lock();
        state.record("screenshot", label);
        Ok(Some(format!("scripted://screenshots/{label}.png")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_click_requires_visible_element() {
        let driver = ScriptedDriver::new()
            .with_visible(["#go"])
            .with_hidden(["#later"]);

        assert!(driver.click("#go", ClickOptions::default()).await.is_ok());
        assert_eq!(
            driver.click("#later", ClickOptions::default()).await,
            Err(DriverError::NotInteractable("#later".into()))
        );
        assert_eq!(
            driver.click("#missing", ClickOptions::default()).await,
            Err(DriverError::ElementNotFound("#missing".into()))
        );
        assert_eq!(driver.calls_for("click"), vec!["#go", "#later", "#missing"]);
    }

    #[tokio::test]
    async fn test_navigation_swaps_route_state() {
        let mut fixture = PageFixture::default();
        fixture.routes.insert(
            "/login".to_string(),
            RouteFixture {
                visible: vec!["#username".into()],
                hidden: vec![],
                redirect: None,
            },
        );
        fixture.routes.insert(
            "/admin".to_string(),
            RouteFixture {
                visible: vec![],
                hidden: vec![],
                redirect: Some("/login".into()),
            },
        );
        let driver = ScriptedDriver::from_fixture(fixture);

        driver.navigate("/login", None).await.unwrap();
        assert_eq!(driver.current_path(), "/login");
        assert!(driver.is_visible("#username", None).await.unwrap());

        driver.navigate("/admin", None).await.unwrap();
        assert_eq!(driver.current_path(), "/login");

        let path = driver
            .evaluate(scripts::LOCATION_PATHNAME, &[])
            .await
            .unwrap();
        assert_eq!(path, json!("/login"));
    }

    #[tokio::test]
    async fn test_injected_failures_count_down() {
        let driver = ScriptedDriver::new().with_visible(["#flaky"]);
        driver.fail_times("#flaky", 2, "Element is detached from DOM");

        for _ in 0..2 {
            let err = driver
                .click("#flaky", ClickOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Element is detached from DOM");
        }
        assert!(driver.click("#flaky", ClickOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_states() {
        let driver = ScriptedDriver::new()
            .with_visible(["#shown"])
            .with_hidden(["#spinner"]);

        let visible = WaitOptions::new(Some(100), Some(WaitState::Visible));
        let hidden = WaitOptions::new(Some(100), Some(WaitState::Hidden));
        let detached = WaitOptions::new(Some(100), Some(WaitState::Detached));

        assert!(driver.wait_for_selector("#shown", visible).await.is_ok());
        assert!(driver.wait_for_selector("#spinner", hidden).await.is_ok());
        assert!(driver.wait_for_selector("#gone", detached).await.is_ok());

        let err = driver
            .wait_for_selector("#spinner", visible)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DriverError::timeout("waiting for `#spinner` to be visible", 100)
        );
    }

    #[tokio::test]
    async fn test_builtin_probes() {
        let driver = ScriptedDriver::new();
        driver.set_state(json!({"cart": {"count": 3}}));
        driver.push_api_call("/api/orders", 201);
        driver.push_api_call("/api/profile", 500);
        driver.mark_service_unavailable("/api/health");

        let count = driver
            .evaluate(scripts::STATE_LOOKUP, &[json!("cart.count")])
            .await
            .unwrap();
        assert_eq!(count, json!(3));

        let orders = driver
            .evaluate(scripts::API_SUCCESS_PROBE, &[json!("/api/orders")])
            .await
            .unwrap();
        assert_eq!(orders, json!(true));

        let profile = driver
            .evaluate(scripts::API_SUCCESS_PROBE, &[json!("/api/profile")])
            .await
            .unwrap();
        assert_eq!(profile, json!(false));

        let health = driver
            .evaluate(scripts::SERVICE_PROBE, &[json!("/api/health")])
            .await
            .unwrap();
        assert_eq!(health, json!(false));

        driver.set_evaluation("window.answer", json!(42));
        assert_eq!(
            driver.evaluate("window.answer", &[]).await.unwrap(),
            json!(42)
        );
    }

    #[test]
    fn test_fixture_defaults() {
        let fixture: PageFixture = serde_json::from_value(json!({
            "visible": ["#a"],
            "failures": {"#b": "boom"}
        }))
        .unwrap();
        assert!(fixture.network_idle);
        assert_eq!(fixture.base_url, DEFAULT_BASE_URL);
        assert_eq!(fixture.failures.get("#b").map(String::as_str), Some("boom"));
    }
}
