//! Steps, signals and preconditions
//!
//! All three are closed tagged unions keyed by a `type` field. Documents carrying
//! a tag this build does not know deserialize into the `Unknown` variant so the
//! executor can fail them deterministically instead of rejecting the whole task.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default timeout applied when a step that supports timeouts does not carry one
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;

/// Page lifecycle event a navigation waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

/// Element state awaited by a wait step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Attached,
    Detached,
    #[default]
    Visible,
    Hidden,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
        }
    }
}

/// A single step of a runtime task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: StepAction,

    /// Failure of an optional step is logged and never aborts the task
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Step variants, each carrying only the fields relevant to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StepAction {
    Navigate {
        url: String,
        #[serde(rename = "waitUntil", default, skip_serializing_if = "Option::is_none")]
        wait_until: Option<WaitUntil>,
    },
    Click {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Wait {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<WaitState>,
    },
    Type {
        selector: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay: Option<u64>,
    },
    Evaluate {
        script: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Vec<Value>>,
    },
    Select {
        selector: String,
        value: String,
    },
    Hover {
        selector: String,
    },
    #[serde(other)]
    Unknown,
}

impl Step {
    pub fn new(action: StepAction) -> Self {
        Self {
            action,
            optional: false,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(StepAction::Navigate {
            url: url.into(),
            wait_until: None,
        })
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Self::new(StepAction::Click {
            selector: selector.into(),
            timeout: None,
        })
    }

    pub fn click_with_timeout(selector: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(StepAction::Click {
            selector: selector.into(),
            timeout: Some(timeout_ms),
        })
    }

    pub fn wait_for(selector: impl Into<String>) -> Self {
        Self::new(StepAction::Wait {
            selector: Some(selector.into()),
            timeout: None,
            state: None,
        })
    }

    pub fn type_text(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(StepAction::Type {
            selector: selector.into(),
            value: value.into(),
            delay: None,
        })
    }

    pub fn evaluate(script: impl Into<String>) -> Self {
        Self::new(StepAction::Evaluate {
            script: script.into(),
            args: None,
        })
    }

    pub fn select(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(StepAction::Select {
            selector: selector.into(),
            value: value.into(),
        })
    }

    pub fn hover(selector: impl Into<String>) -> Self {
        Self::new(StepAction::Hover {
            selector: selector.into(),
        })
    }

    /// Mark the step as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Step type tag as it appears in task documents
    pub fn kind(&self) -> &'static str {
        match &self.action {
            StepAction::Navigate { .. } => "navigate",
            StepAction::Click { .. } => "click",
            StepAction::Wait { .. } => "wait",
            StepAction::Type { .. } => "type",
            StepAction::Evaluate { .. } => "evaluate",
            StepAction::Select { .. } => "select",
            StepAction::Hover { .. } => "hover",
            StepAction::Unknown => "unknown",
        }
    }

    /// Selector targeted by the step, if the variant has one
    pub fn selector(&self) -> Option<&str> {
        match &self.action {
            StepAction::Click { selector, .. }
            | StepAction::Type { selector, .. }
            | StepAction::Select { selector, .. }
            | StepAction::Hover { selector } => Some(selector.as_str()),
            StepAction::Wait { selector, .. } => selector.as_deref(),
            _ => None,
        }
    }

    /// Replace the selector; returns `false` when the variant carries none
    pub fn set_selector(&mut self, new_selector: impl Into<String>) -> bool {
        match &mut self.action {
            StepAction::Click { selector, .. }
            | StepAction::Type { selector, .. }
            | StepAction::Select { selector, .. }
            | StepAction::Hover { selector } => {
                *selector = new_selector.into();
                true
            }
            StepAction::Wait {
                selector: Some(selector),
                ..
            } => {
                *selector = new_selector.into();
                true
            }
            _ => false,
        }
    }

    /// Whether the variant carries a timeout field (set or not)
    pub fn supports_timeout(&self) -> bool {
        matches!(
            self.action,
            StepAction::Click { .. } | StepAction::Wait { .. }
        )
    }

    pub fn timeout(&self) -> Option<u64> {
        match &self.action {
            StepAction::Click { timeout, .. } | StepAction::Wait { timeout, .. } => *timeout,
            _ => None,
        }
    }

    /// Set the timeout; returns `false` when the variant carries none
    pub fn set_timeout(&mut self, timeout_ms: u64) -> bool {
        match &mut self.action {
            StepAction::Click { timeout, .. } | StepAction::Wait { timeout, .. } => {
                *timeout = Some(timeout_ms);
                true
            }
            _ => false,
        }
    }
}

/// Post-condition checked after all steps succeed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Signal {
    DomVisible {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    DomHidden {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    /// Current `location.pathname` equals `value`
    RouteMatch { value: String },
    NetworkIdle {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    /// No element matches `selector` (or the configured error-toast selector)
    NoErrorToast {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    /// A finished request whose URL contains `value` reported a 2xx status
    ApiSuccess {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    /// Injected application state at dotted key `selector` equals `value`
    StateMatch { selector: String, value: Value },
    #[serde(other)]
    Unknown,
}

impl Signal {
    pub fn kind(&self) -> &'static str {
        match self {
            Signal::DomVisible { .. } => "dom-visible",
            Signal::DomHidden { .. } => "dom-hidden",
            Signal::RouteMatch { .. } => "route-match",
            Signal::NetworkIdle { .. } => "network-idle",
            Signal::NoErrorToast { .. } => "no-error-toast",
            Signal::ApiSuccess { .. } => "api-success",
            Signal::StateMatch { .. } => "state-match",
            Signal::Unknown => "unknown",
        }
    }
}

/// Boolean check performed before any step runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Precondition {
    AuthRequired {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    DataReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    ServiceAvailable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl Precondition {
    pub fn kind(&self) -> &'static str {
        match self {
            Precondition::AuthRequired { .. } => "auth-required",
            Precondition::DataReady { .. } => "data-ready",
            Precondition::ServiceAvailable { .. } => "service-available",
            Precondition::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_parses_optional_flag() {
        let step: Step = serde_json::from_value(json!({
            "type": "click",
            "selector": "[data-testid=\"submit\"]",
            "timeout": 10000,
            "optional": true
        }))
        .unwrap();

        assert!(step.optional);
        assert_eq!(step.kind(), "click");
        assert_eq!(step.selector(), Some("[data-testid=\"submit\"]"));
        assert_eq!(step.timeout(), Some(10000));
    }

    #[test]
    fn test_step_optional_defaults_to_false() {
        let step: Step = serde_json::from_value(json!({
            "type": "navigate",
            "url": "/login",
            "waitUntil": "networkidle"
        }))
        .unwrap();

        assert!(!step.optional);
        assert_eq!(
            step.action,
            StepAction::Navigate {
                url: "/login".to_string(),
                wait_until: Some(WaitUntil::NetworkIdle),
            }
        );
    }

    #[test]
    fn test_unknown_step_type_is_preserved() {
        let step: Step = serde_json::from_value(json!({
            "type": "drag",
            "selector": "#handle"
        }))
        .unwrap();
        assert_eq!(step.action, StepAction::Unknown);
        assert_eq!(step.kind(), "unknown");
        assert_eq!(step.selector(), None);
    }

    #[test]
    fn test_set_selector_only_on_targeting_steps() {
        let mut click = Step::click("#a");
        assert!(click.set_selector("#b"));
        assert_eq!(click.selector(), Some("#b"));

        let mut nav = Step::navigate("/");
        assert!(!nav.set_selector("#b"));

        let mut bare_wait = Step::new(StepAction::Wait {
            selector: None,
            timeout: Some(500),
            state: None,
        });
        assert!(!bare_wait.set_selector("#b"));
    }

    #[test]
    fn test_timeout_support() {
        let mut click = Step::click("#a");
        assert!(click.supports_timeout());
        assert_eq!(click.timeout(), None);
        assert!(click.set_timeout(45_000));
        assert_eq!(click.timeout(), Some(45_000));

        let mut hover = Step::hover("#a");
        assert!(!hover.supports_timeout());
        assert!(!hover.set_timeout(1));
    }

    #[test]
    fn test_signal_and_precondition_tags() {
        let signals: Vec<Signal> = serde_json::from_value(json!([
            {"type": "dom-visible", "selector": ".welcome"},
            {"type": "route-match", "value": "/dashboard"},
            {"type": "state-match", "selector": "cart.count", "value": 3},
            {"type": "pixel-perfect"}
        ]))
        .unwrap();
        let kinds: Vec<_> = signals.iter().map(Signal::kind).collect();
        assert_eq!(
            kinds,
            vec!["dom-visible", "route-match", "state-match", "unknown"]
        );

        let precondition: Precondition =
            serde_json::from_value(json!({"type": "service-available", "url": "/api/health"}))
                .unwrap();
        assert_eq!(precondition.kind(), "service-available");
    }
}
