//! Deterministic selector variants for `infer-alternative-selector`

use once_cell::sync::Lazy;
use regex::Regex;

static TEST_ID_SELECTOR: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"\[data-testid=["']?([^"'\]]+)["']?\]"#).ok());

/// Original selector followed by its data-test, aria-label and class-based
/// rewrites, de-duplicated in that order.
///
/// Selectors without a `data-testid` attribute produce only themselves.
pub fn synthesize_variants(selector: &str) -> Vec<String> {
    let class_based = TEST_ID_SELECTOR
        .as_ref()
        .map(|re| re.replace_all(selector, ".${1}").into_owned())
        .unwrap_or_else(|| selector.to_string());

    let candidates = [
        selector.to_string(),
        selector.replace("data-testid", "data-test"),
        selector.replace("[data-testid=", "[aria-label="),
        class_based,
    ];

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_id_variants() {
        assert_eq!(
            synthesize_variants(r#"[data-testid="submit"]"#),
            vec![
                r#"[data-testid="submit"]"#,
                r#"[data-test="submit"]"#,
                r#"[aria-label="submit"]"#,
                ".submit",
            ]
        );
    }

    #[test]
    fn test_compound_selector_keeps_context() {
        assert_eq!(
            synthesize_variants(r#"form [data-testid='save'] > span"#),
            vec![
                "form [data-testid='save'] > span",
                "form [data-test='save'] > span",
                "form [aria-label='save'] > span",
                "form .save > span",
            ]
        );
    }

    #[test]
    fn test_plain_selector_has_single_variant() {
        assert_eq!(synthesize_variants("#submit"), vec!["#submit"]);
    }
}
