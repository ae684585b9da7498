//! Selector strategy generation
//!
//! Categories in confidence order:
//! 1. `data-testid` (1.0) and `data-test` (0.95)
//! 2. ARIA role + label (0.9)
//! 3. Text on buttons and links, XPath (0.85) then CSS (0.8)
//! 4. Plain id (0.75)
//! 5. Meaningful classes (0.6)
//! 6. Raw structural path (0.4)

use crate::types::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub const TEST_ID_CONFIDENCE: f64 = 1.0;
pub const DATA_TEST_CONFIDENCE: f64 = 0.95;
pub const ROLE_CONFIDENCE: f64 = 0.9;
pub const TEXT_XPATH_CONFIDENCE: f64 = 0.85;
pub const TEXT_CSS_CONFIDENCE: f64 = 0.8;
pub const ID_CONFIDENCE: f64 = 0.75;
pub const CLASS_CONFIDENCE: f64 = 0.6;
pub const PATH_CONFIDENCE: f64 = 0.4;

const TEXT_TAGS: [&str; 2] = ["button", "a"];

static GENERATED_CLASS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // emotion / styled-components / styled-jsx
        r"^css-[a-z0-9]+$",
        r"^sc-[A-Za-z0-9]+$",
        r"^jsx-\d+$",
        // css modules: Block_element__hash
        r"^[A-Za-z][A-Za-z0-9-]*_[A-Za-z0-9-]+__[A-Za-z0-9_-]{5}$",
        r"^[A-Za-z0-9]+-module__[A-Za-z0-9_-]+$",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static ATTRIBUTE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"\[([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*["']?([^"'\]]*)["']?\]"#).ok());
static ID_TOKEN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"#([A-Za-z_][-A-Za-z0-9_]*)").ok());
static CLASS_TOKEN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\.([A-Za-z_][-A-Za-z0-9_]*)").ok());
static LEADING_TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9-]*)").ok());
static HAS_TEXT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#":has-text\(["']([^"']*)["']\)"#).ok());
static XPATH_TEXT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"contains\(text\(\),\s*["']([^"']*)["']\)"#).ok());
static XPATH_TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^//([A-Za-z][A-Za-z0-9-]*)").ok());

/// Whether a class name looks hand-written rather than generated or hashed
pub fn is_meaningful_class(class: &str) -> bool {
    if class.is_empty() || GENERATED_CLASS.iter().any(|re| re.is_match(class)) {
        return false;
    }
    // bare hashes such as `a1b2c3`
    let hash_like = class.len() >= 6
        && class.chars().all(|c| c.is_ascii_alphanumeric())
        && class.chars().any(|c| c.is_ascii_digit())
        && class.chars().any(|c| c.is_ascii_alphabetic());
    !hash_like
}

fn quote(value: &str) -> String {
    value.replace('"', "\\\"")
}

/// Candidate selectors for an element, highest confidence first
pub fn generate_strategies(element: &ElementInfo) -> Vec<SelectorStrategy> {
    let mut strategies = Vec::new();

    if let Some(test_id) = non_empty(&element.test_id) {
        strategies.push(SelectorStrategy::new(
            StrategyKind::TestId,
            format!("[data-testid=\"{}\"]", quote(test_id)),
            TEST_ID_CONFIDENCE,
            "data-testid attribute",
        ));
    }

    if let Some(data_test) = non_empty(&element.data_test) {
        strategies.push(SelectorStrategy::new(
            StrategyKind::TestId,
            format!("[data-test=\"{}\"]", quote(data_test)),
            DATA_TEST_CONFIDENCE,
            "data-test attribute",
        ));
    }

    if let (Some(role), Some(label)) = (non_empty(&element.role), non_empty(&element.aria_label)) {
        strategies.push(SelectorStrategy::new(
            StrategyKind::Role,
            format!("[role=\"{}\"][aria-label=\"{}\"]", quote(role), quote(label)),
            ROLE_CONFIDENCE,
            "ARIA role and label",
        ));
    }

    let interactive_tag = element
        .tag_name
        .as_deref()
        .map(str::to_ascii_lowercase)
        .filter(|tag| TEXT_TAGS.contains(&tag.as_str()));
    if let (Some(text), Some(tag)) = (non_empty(&element.text), interactive_tag) {
        let text = text.trim();
        strategies.push(SelectorStrategy::new(
            StrategyKind::XPath,
            format!("//{tag}[contains(text(), \"{}\")]", quote(text)),
            TEXT_XPATH_CONFIDENCE,
            "text content (xpath)",
        ));
        strategies.push(SelectorStrategy::new(
            StrategyKind::Text,
            format!("{tag}:has-text(\"{}\")", quote(text)),
            TEXT_CSS_CONFIDENCE,
            "text content (css)",
        ));
    }

    if let Some(id) = non_empty(&element.id) {
        strategies.push(SelectorStrategy::new(
            StrategyKind::Css,
            format!("#{id}"),
            ID_CONFIDENCE,
            "id attribute",
        ));
    }

    let classes: Vec<&str> = element
        .class_names
        .iter()
        .map(String::as_str)
        .filter(|class| is_meaningful_class(class))
        .collect();
    if !classes.is_empty() {
        strategies.push(SelectorStrategy::new(
            StrategyKind::Css,
            format!(".{}", classes.join(".")),
            CLASS_CONFIDENCE,
            "class names",
        ));
    }

    if let Some(path) = non_empty(&element.path) {
        let kind = if path.starts_with('/') {
            StrategyKind::XPath
        } else {
            StrategyKind::Css
        };
        strategies.push(SelectorStrategy::new(
            kind,
            path,
            PATH_CONFIDENCE,
            "structural path",
        ));
    }

    let mut seen = HashSet::new();
    strategies.retain(|strategy| seen.insert(strategy.selector.clone()));
    // stable: equal confidences keep generation order
    strategies.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    strategies
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn first_capture(re: &Lazy<Option<Regex>>, haystack: &str) -> Option<String> {
    re.as_ref()?
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Reverse-parse a selector into partial element metadata
///
/// The original selector is always kept as the structural path so it stays a
/// candidate even when nothing else can be recovered.
pub fn element_from_selector(selector: &str) -> ElementInfo {
    let selector = selector.trim();
    let mut info = ElementInfo {
        path: Some(selector.to_string()),
        ..ElementInfo::default()
    };

    if selector.starts_with('/') {
        info.tag_name = first_capture(&XPATH_TAG, selector);
        info.text = first_capture(&XPATH_TEXT, selector);
        return info;
    }

    let mut remainder = selector.to_string();
    if let Some(re) = ATTRIBUTE.as_ref() {
        for caps in re.captures_iter(selector) {
            let value = caps.get(2).map(|m| m.as_str().to_string());
            match caps.get(1).map(|m| m.as_str()) {
                Some("data-testid") => info.test_id = value,
                Some("data-test") => info.data_test = value,
                Some("role") => info.role = value,
                Some("aria-label") => info.aria_label = value,
                Some("id") => info.id = value,
                _ => {}
            }
        }
        remainder = re.replace_all(selector, "").into_owned();
    }

    info.text = first_capture(&HAS_TEXT, &remainder);
    if let Some(re) = HAS_TEXT.as_ref() {
        remainder = re.replace_all(&remainder, "").into_owned();
    }

    if info.id.is_none() {
        info.id = first_capture(&ID_TOKEN, &remainder);
    }
    if let Some(re) = CLASS_TOKEN.as_ref() {
        info.class_names = re
            .captures_iter(&remainder)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect();
    }
    info.tag_name = first_capture(&LEADING_TAG, &remainder);

    info
}

/// Strategies for either form of target
pub fn strategies_for_target(target: &ElementTarget) -> Vec<SelectorStrategy> {
    match target {
        ElementTarget::Element(info) => generate_strategies(info),
        ElementTarget::Selector(selector) => generate_strategies(&element_from_selector(selector)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_test_id_yields_single_strategy() {
        let strategies = generate_strategies(&ElementInfo::with_test_id("submit"));
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].selector, "[data-testid=\"submit\"]");
        assert_eq!(strategies[0].confidence, 1.0);
        assert_eq!(strategies[0].kind, StrategyKind::TestId);
    }

    #[test]
    fn test_strategy_serializes_type_tag() {
        let strategies = generate_strategies(&ElementInfo {
            test_id: Some("submit".into()),
            id: Some("go".into()),
            ..ElementInfo::default()
        });
        let value = serde_json::to_value(&strategies).unwrap();
        assert_eq!(value[0]["type"], "testid");
        assert_eq!(value[1]["type"], "css");
        assert!(value[0].get("kind").is_none());
    }

    #[test]
    fn test_full_element_is_ranked() {
        let element = ElementInfo {
            test_id: Some("save".into()),
            data_test: Some("save-btn".into()),
            id: Some("save".into()),
            class_names: vec!["btn".into(), "css-1x2y3z".into(), "primary".into()],
            tag_name: Some("button".into()),
            role: Some("button".into()),
            aria_label: Some("Save".into()),
            text: Some("Save changes".into()),
            path: Some("form > button:nth-child(2)".into()),
        };

        let strategies = generate_strategies(&element);
        let selectors: Vec<&str> = strategies.iter().map(|s| s.selector.as_str()).collect();
        assert_eq!(
            selectors,
            vec![
                "[data-testid=\"save\"]",
                "[data-test=\"save-btn\"]",
                "[role=\"button\"][aria-label=\"Save\"]",
                "//button[contains(text(), \"Save changes\")]",
                "button:has-text(\"Save changes\")",
                "#save",
                ".btn.primary",
                "form > button:nth-child(2)",
            ]
        );
        let confidences: Vec<f64> = strategies.iter().map(|s| s.confidence).collect();
        assert_eq!(confidences, vec![1.0, 0.95, 0.9, 0.85, 0.8, 0.75, 0.6, 0.4]);
    }

    #[test]
    fn test_text_requires_interactive_tag() {
        let element = ElementInfo {
            tag_name: Some("div".into()),
            text: Some("Hello".into()),
            ..ElementInfo::default()
        };
        assert!(generate_strategies(&element).is_empty());
    }

    #[test]
    fn test_role_requires_label() {
        let element = ElementInfo {
            role: Some("button".into()),
            ..ElementInfo::default()
        };
        assert!(generate_strategies(&element).is_empty());
    }

    #[test]
    fn test_generated_classes_are_filtered() {
        assert!(is_meaningful_class("btn-primary"));
        assert!(is_meaningful_class("header"));
        assert!(!is_meaningful_class("css-1n7v3ny"));
        assert!(!is_meaningful_class("sc-bdVaJa"));
        assert!(!is_meaningful_class("jsx-2345123"));
        assert!(!is_meaningful_class("Button_root__a1B2c"));
        assert!(!is_meaningful_class("x9f8e7d"));

        let element = ElementInfo {
            class_names: vec!["css-abc123".into(), "sc-xyz".into()],
            ..ElementInfo::default()
        };
        assert!(generate_strategies(&element).is_empty());
    }

    #[test]
    fn test_xpath_path_kind() {
        let element = ElementInfo {
            path: Some("/html/body/div[2]/button".into()),
            ..ElementInfo::default()
        };
        let strategies = generate_strategies(&element);
        assert_eq!(strategies[0].kind, StrategyKind::XPath);
        assert_eq!(strategies[0].confidence, 0.4);
    }

    #[test]
    fn test_reverse_parse_test_id_selector() {
        let info = element_from_selector("[data-testid=\"submit\"]");
        assert_eq!(info.test_id.as_deref(), Some("submit"));
        assert_eq!(info.path.as_deref(), Some("[data-testid=\"submit\"]"));

        // the path duplicates the test id selector and collapses into it
        let strategies = generate_strategies(&info);
        assert_eq!(strategies.len(), 1);
    }

    #[test]
    fn test_reverse_parse_compound_selector() {
        let info = element_from_selector("button#checkout.btn.large[aria-label=\"Pay\"][role=\"button\"]");
        assert_eq!(info.tag_name.as_deref(), Some("button"));
        assert_eq!(info.id.as_deref(), Some("checkout"));
        assert_eq!(info.class_names, vec!["btn", "large"]);
        assert_eq!(info.role.as_deref(), Some("button"));
        assert_eq!(info.aria_label.as_deref(), Some("Pay"));

        let selectors: Vec<String> = generate_strategies(&info)
            .into_iter()
            .map(|s| s.selector)
            .collect();
        assert_eq!(
            selectors,
            vec![
                "[role=\"button\"][aria-label=\"Pay\"]".to_string(),
                "#checkout".to_string(),
                ".btn.large".to_string(),
                "button#checkout.btn.large[aria-label=\"Pay\"][role=\"button\"]".to_string(),
            ]
        );
    }

    #[test]
    fn test_reverse_parse_text_selectors() {
        let css = element_from_selector("button:has-text(\"Sign in\")");
        assert_eq!(css.tag_name.as_deref(), Some("button"));
        assert_eq!(css.text.as_deref(), Some("Sign in"));

        let xpath = element_from_selector("//a[contains(text(), \"Docs\")]");
        assert_eq!(xpath.tag_name.as_deref(), Some("a"));
        assert_eq!(xpath.text.as_deref(), Some("Docs"));
    }
}
