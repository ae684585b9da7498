//! Core types for locator system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sparse element description
///
/// Every field is optional; strategies are generated from whatever is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementInfo {
    /// `data-testid` attribute
    pub test_id: Option<String>,

    /// `data-test` attribute
    pub data_test: Option<String>,

    pub id: Option<String>,

    pub class_names: Vec<String>,

    pub tag_name: Option<String>,

    pub role: Option<String>,

    pub aria_label: Option<String>,

    /// Visible text content
    pub text: Option<String>,

    /// Raw structural path (CSS or XPath)
    pub path: Option<String>,
}

impl ElementInfo {
    pub fn with_test_id(test_id: impl Into<String>) -> Self {
        Self {
            test_id: Some(test_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Where a strategy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    TestId,
    Role,
    Text,
    Css,
    XPath,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::TestId => "testid",
            StrategyKind::Role => "role",
            StrategyKind::Text => "text",
            StrategyKind::Css => "css",
            StrategyKind::XPath => "xpath",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One candidate selector with its provenance and confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorStrategy {
    #[serde(rename = "type")]
    pub kind: StrategyKind,
    pub selector: String,
    /// Fixed per category (0.0-1.0)
    pub confidence: f64,
    pub description: String,
}

impl SelectorStrategy {
    pub fn new(
        kind: StrategyKind,
        selector: impl Into<String>,
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            selector: selector.into(),
            confidence,
            description: description.into(),
        }
    }
}

/// What a smart action should find
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementTarget {
    /// Structured description
    Element(ElementInfo),
    /// Raw selector, reverse-parsed into a description
    Selector(String),
}

impl ElementTarget {
    pub fn selector(selector: impl Into<String>) -> Self {
        Self::Selector(selector.into())
    }
}

impl From<ElementInfo> for ElementTarget {
    fn from(info: ElementInfo) -> Self {
        Self::Element(info)
    }
}

impl From<&str> for ElementTarget {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl fmt::Display for ElementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementTarget::Selector(selector) => f.write_str(selector),
            ElementTarget::Element(info) => match (&info.test_id, &info.id, &info.text) {
                (Some(test_id), _, _) => write!(f, "element[testid={test_id}]"),
                (None, Some(id), _) => write!(f, "element[id={id}]"),
                (None, None, Some(text)) => write!(f, "element[text={text}]"),
                _ => f.write_str("element"),
            },
        }
    }
}

/// Smart action tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Full passes over the strategy list for clicks
    pub max_retries: u32,

    /// Delay between full passes
    pub retry_delay_ms: u64,

    /// Waits only try strategies at or above this confidence
    pub min_wait_confidence: f64,

    /// Per-strategy wait timeout
    pub wait_timeout_ms: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            min_wait_confidence: 0.6,
            wait_timeout_ms: 5000,
        }
    }
}

/// Which strategy resolved a smart action
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub strategy: SelectorStrategy,
    /// Driver calls issued, including the successful one
    pub attempts: usize,
}
