//! Conflict resolution between candidate rules

use crate::rule::{Rule, RuleScope};
use adaptive_core_types::RuntimeTask;

/// How well a rule's scope fits the task
pub fn context_match(rule: &Rule, task: &RuntimeTask) -> f64 {
    match rule.scope {
        RuleScope::Global => 1.0,
        RuleScope::Component if task.context.has_components() => 0.9,
        RuleScope::Route if task.context.has_routes() => 0.8,
        _ => 0.7,
    }
}

/// `weight x confidence x context_match`
pub fn score(rule: &Rule, task: &RuntimeTask) -> f64 {
    rule.weight * rule.confidence * context_match(rule, task)
}

/// Highest-scoring candidate; ties keep the earliest rule
pub fn resolve_conflict<'a>(task: &RuntimeTask, candidates: &'a [Rule]) -> Option<&'a Rule> {
    let (first, rest) = candidates.split_first()?;
    let mut best = first;
    let mut best_score = score(first, task);
    for rule in rest {
        let candidate_score = score(rule, task);
        if candidate_score > best_score {
            best = rule;
            best_score = candidate_score;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{LearningAction, LearningActionKind};
    use adaptive_core_types::FailureReason;

    fn rule(id: &str, weight: f64, confidence: f64, scope: RuleScope) -> Rule {
        Rule::new(
            id,
            FailureReason::SelectorNotFound,
            LearningAction::new(LearningActionKind::InferAlternativeSelector),
            weight,
            confidence,
        )
        .with_scope(scope)
    }

    #[test]
    fn test_single_candidate_returned_unmodified() {
        let task = RuntimeTask::new("t1", "x");
        let only = vec![rule("a", 0.3, 0.1, RuleScope::Route)];
        assert_eq!(resolve_conflict(&task, &only), Some(&only[0]));
        assert_eq!(resolve_conflict(&task, &[]), None);
    }

    #[test]
    fn test_context_match_values() {
        let bare = RuntimeTask::new("t1", "x");
        let scoped = RuntimeTask::new("t1", "x")
            .with_component("LoginForm")
            .with_route("/login");

        assert_eq!(context_match(&rule("g", 1.0, 1.0, RuleScope::Global), &bare), 1.0);
        assert_eq!(context_match(&rule("c", 1.0, 1.0, RuleScope::Component), &scoped), 0.9);
        assert_eq!(context_match(&rule("r", 1.0, 1.0, RuleScope::Route), &scoped), 0.8);
        assert_eq!(context_match(&rule("c", 1.0, 1.0, RuleScope::Component), &bare), 0.7);
        assert_eq!(context_match(&rule("r", 1.0, 1.0, RuleScope::Route), &bare), 0.7);
        assert_eq!(context_match(&rule("s", 1.0, 1.0, RuleScope::Signal), &scoped), 0.7);
    }

    #[test]
    fn test_highest_score_wins() {
        let task = RuntimeTask::new("t1", "x").with_component("Cart");
        let rules = vec![
            rule("global", 0.6, 0.6, RuleScope::Global),      // 0.36
            rule("component", 0.8, 0.8, RuleScope::Component), // 0.576
            rule("route", 0.9, 0.9, RuleScope::Route),         // 0.567
        ];
        assert_eq!(resolve_conflict(&task, &rules).map(|r| r.id.as_str()), Some("component"));
    }

    #[test]
    fn test_ties_keep_first() {
        let task = RuntimeTask::new("t1", "x");
        let rules = vec![
            rule("first", 0.5, 0.8, RuleScope::Global),
            rule("second", 0.8, 0.5, RuleScope::Global),
        ];
        assert_eq!(resolve_conflict(&task, &rules).map(|r| r.id.as_str()), Some("first"));
    }
}
