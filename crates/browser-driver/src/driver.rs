//! Browser driver trait

use crate::errors::DriverError;
use crate::types::{ClickOptions, TypeOptions, WaitOptions, WaitUntil};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Browser automation surface consumed by the executor, gate and locator.
///
/// Implementations must be usable from a single cooperative task; the runner
/// never issues two operations concurrently against the same driver.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to a URL (absolute, or relative to the driver's base URL)
    async fn navigate(&self, url: &str, wait_until: Option<WaitUntil>) -> Result<(), DriverError>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str, options: ClickOptions) -> Result<(), DriverError>;

    /// Wait until `selector` reaches the requested state
    async fn wait_for_selector(
        &self,
        selector: &str,
        options: WaitOptions,
    ) -> Result<(), DriverError>;

    /// Type `value` into the element matching `selector`
    async fn type_text(
        &self,
        selector: &str,
        value: &str,
        options: TypeOptions,
    ) -> Result<(), DriverError>;

    /// Evaluate a script in the page; `args` are passed when the script is a function
    async fn evaluate(&self, script: &str, args: &[Value]) -> Result<Value, DriverError>;

    /// Select an option by value
    async fn select(&self, selector: &str, value: &str) -> Result<(), DriverError>;

    /// Hover the element matching `selector`
    async fn hover(&self, selector: &str) -> Result<(), DriverError>;

    /// Whether `selector` is visible, waiting up to `timeout_ms`
    async fn is_visible(&self, selector: &str, timeout_ms: Option<u64>)
        -> Result<bool, DriverError>;

    /// Whether any element matches `selector` right now
    async fn query_selector(&self, selector: &str) -> Result<bool, DriverError>;

    /// Wait until the network has been quiet
    async fn wait_for_network_idle(&self, timeout_ms: Option<u64>) -> Result<(), DriverError>;

    /// Capture a screenshot and return a reference to it, if supported
    async fn screenshot(&self, _label: &str) -> Result<Option<String>, DriverError> {
        Ok(None)
    }
}

pub type SharedDriver = Arc<dyn BrowserDriver>;

/// JavaScript truthiness of an evaluation result
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0 && !v.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("token")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }
}
