//! Comparison helpers shared by the checks

use adaptive_core_types::{Precondition, Signal};
use serde_json::Value;

/// Route comparison; a trailing slash is ignored except on the root path
pub fn route_matches(actual: &Value, expected: &str) -> bool {
    let Some(actual) = actual.as_str() else {
        return false;
    };
    normalize_route(actual) == normalize_route(expected)
}

fn normalize_route(route: &str) -> &str {
    let trimmed = route.trim();
    if trimmed.len() > 1 {
        trimmed.trim_end_matches('/')
    } else {
        trimmed
    }
}

/// Structural equality with numbers compared by value (`3` == `3.0`)
pub fn state_matches(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| state_matches(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| state_matches(x, y)))
        }
        _ => actual == expected,
    }
}

/// Short human description of a signal
pub fn describe_signal(signal: &Signal) -> String {
    match signal {
        Signal::DomVisible { selector, .. } => format!("{selector} visible"),
        Signal::DomHidden { selector, .. } => format!("{selector} hidden"),
        Signal::RouteMatch { value } => format!("route is {value}"),
        Signal::NetworkIdle { .. } => "network idle".to_string(),
        Signal::NoErrorToast { selector } => match selector {
            Some(selector) => format!("no {selector}"),
            None => "no error toast".to_string(),
        },
        Signal::ApiSuccess { value, .. } => match value {
            Some(fragment) => format!("API call {fragment} succeeded"),
            None => "an API call succeeded".to_string(),
        },
        Signal::StateMatch { selector, value } => format!("state {selector} == {value}"),
        Signal::Unknown => "unknown signal".to_string(),
    }
}

/// Short human description of a precondition
pub fn describe_precondition(precondition: &Precondition) -> String {
    match precondition {
        Precondition::AuthRequired { .. } => "session authenticated".to_string(),
        Precondition::DataReady { selector, .. } => match selector {
            Some(selector) => format!("{selector} loaded"),
            None => "document ready".to_string(),
        },
        Precondition::ServiceAvailable { url } => {
            format!("service {} reachable", url.as_deref().unwrap_or("/"))
        }
        Precondition::Unknown => "unknown precondition".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_matches() {
        assert!(route_matches(&json!("/dashboard"), "/dashboard"));
        assert!(route_matches(&json!("/dashboard/"), "/dashboard"));
        assert!(route_matches(&json!("/"), "/"));
        assert!(!route_matches(&json!("/login"), "/dashboard"));
        assert!(!route_matches(&Value::Null, "/dashboard"));
    }

    #[test]
    fn test_state_matches() {
        assert!(state_matches(&json!(3), &json!(3.0)));
        assert!(state_matches(
            &json!({"user": {"id": 7, "roles": ["admin"]}}),
            &json!({"user": {"roles": ["admin"], "id": 7.0}})
        ));
        assert!(!state_matches(&json!("3"), &json!(3)));
        assert!(!state_matches(&Value::Null, &json!(false)));
    }
}
