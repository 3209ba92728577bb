//! Event classifier
//!
//! A change event is classified by walking an ordered table of
//! `(predicate, category)` rules; the first matching rule wins and
//! [`Category::Other`] is the fallback. Rule order matters: a fix is never
//! counted as screening even when both predicates hold.

use crate::types::{Category, ChangeEvent, EvaluationTier, LifecycleType};
use once_cell::sync::Lazy;
use regex::Regex;

/// Marks a human or robot comment in a notification body
pub const COMMENT_MARKER: &str = "--- Comment #";

/// Build-service robot comments carry this line
pub const AUTOMATED_MARKER: &str = "This is an autogenerated message for OBS integration";

fn reopen_pattern() -> &'static Regex {
    // The trailing empty alternative makes this match every body. Kept as-is:
    // the reopen rule effectively reduces to "Status changed to an open state".
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Status|\s*CLOSED\s*|").expect("Valid reopen regex"));
    &PATTERN
}

/// Status and resolution changed, landing in a terminal state
pub fn is_fix(event: &ChangeEvent) -> bool {
    event.lifecycle_type == LifecycleType::Changed
        && event.changed_fields.contains_all(&["Status", "Resolution"])
        && event.is_closed()
}

/// Comment on an open bug by a human
pub fn is_screening(event: &ChangeEvent) -> bool {
    event.lifecycle_type == LifecycleType::Changed
        && !event.is_closed()
        && event.body_text.contains(COMMENT_MARKER)
        && !event.body_text.contains(AUTOMATED_MARKER)
}

pub fn is_new(event: &ChangeEvent) -> bool {
    event.lifecycle_type == LifecycleType::New
}

/// Comment posted by the build-service integration robot
pub fn is_automated(event: &ChangeEvent) -> bool {
    event.body_text.contains(COMMENT_MARKER) && event.body_text.contains(AUTOMATED_MARKER)
}

/// Someone touched the evaluation field itself
pub fn is_suspicious(event: &ChangeEvent) -> bool {
    event.lifecycle_type == LifecycleType::Changed && event.changed_fields.contains("Whiteboard")
}

/// Status moved back to an open state
pub fn is_reopen(event: &ChangeEvent) -> bool {
    event.lifecycle_type == LifecycleType::Changed
        && event.changed_fields.contains("Status")
        && !event.is_closed()
        && reopen_pattern().is_match(&event.body_text)
}

/// One entry of the classification table
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub category: Category,
    pub predicate: fn(&ChangeEvent) -> bool,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

/// Ordered rule table; see [`Classifier::default`] for the contest rules
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(vec![
            Rule {
                name: "fix",
                category: Category::Fix,
                predicate: is_fix,
            },
            Rule {
                name: "screened-or-new",
                category: Category::ScreenedOrNew,
                predicate: |e| (is_screening(e) || is_new(e)) && !is_automated(e),
            },
            Rule {
                name: "suspicious-or-reopen",
                category: Category::SuspiciousOrReopen,
                predicate: |e| is_suspicious(e) || is_reopen(e),
            },
        ])
    }
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Category of an event
    ///
    /// The tier does not influence the category; it is accepted so callers
    /// classify with the same inputs they score with.
    pub fn classify(&self, event: &ChangeEvent, _tier: EvaluationTier) -> Category {
        self.matching_rule(event)
            .map(|rule| rule.category)
            .unwrap_or(Category::Other)
    }

    /// First rule whose predicate holds
    pub fn matching_rule(&self, event: &ChangeEvent) -> Option<&Rule> {
        self.rules.iter().find(|rule| (rule.predicate)(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BugId, ChangedFields, ClassificationMeta};
    use chrono::Utc;
    use proptest::prelude::*;

    fn event(lifecycle: LifecycleType, status: &str, fields: &str, body: &str) -> ChangeEvent {
        ChangeEvent {
            timestamp: Utc::now(),
            reporter_name: "dev@example.com".to_string(),
            subject: "[Bug 1] something".to_string(),
            bug_id: BugId(1),
            lifecycle_type: lifecycle,
            status: status.to_string(),
            changed_fields: ChangedFields::parse(fields),
            body_text: body.to_string(),
            assignee: "bnc-team@example.com".to_string(),
            classification_meta: ClassificationMeta::default(),
        }
    }

    fn classify(e: &ChangeEvent) -> Category {
        Classifier::default().classify(e, EvaluationTier::None)
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<_> = Classifier::default().rules().iter().map(|r| r.name).collect();
        assert_eq!(names, ["fix", "screened-or-new", "suspicious-or-reopen"]);
    }

    #[test]
    fn test_fix() {
        let e = event(LifecycleType::Changed, "RESOLVED", "Status Resolution", "");
        assert_eq!(classify(&e), Category::Fix);
        let e = event(LifecycleType::Changed, "CLOSED", "Status Resolution CC", "");
        assert_eq!(classify(&e), Category::Fix);
    }

    #[test]
    fn test_fix_wins_over_screening_comment() {
        // Closed with a comment and a whiteboard edit: still a fix
        let e = event(
            LifecycleType::Changed,
            "RESOLVED",
            "Status Resolution Whiteboard",
            "--- Comment #3 from Dev ---\nfixed in Factory",
        );
        assert_eq!(classify(&e), Category::Fix);
    }

    #[test]
    fn test_resolution_without_status_is_not_fix() {
        let e = event(LifecycleType::Changed, "RESOLVED", "Resolution", "");
        assert_eq!(classify(&e), Category::Other);
    }

    #[test]
    fn test_new_bug_is_screened() {
        let e = event(LifecycleType::New, "NEW", "", "--- Comment #0 from Reporter ---");
        assert_eq!(classify(&e), Category::ScreenedOrNew);
    }

    #[test]
    fn test_comment_on_open_bug_is_screened() {
        let e = event(
            LifecycleType::Changed,
            "NEW",
            "CC",
            "--- Comment #4 from Screener ---\nreproducible on 13.1",
        );
        assert_eq!(classify(&e), Category::ScreenedOrNew);
    }

    #[test]
    fn test_automated_comment_is_not_screening() {
        let body = format!("{}5 from OBS ---\n{}", COMMENT_MARKER, AUTOMATED_MARKER);
        let e = event(LifecycleType::Changed, "NEW", "", &body);
        assert_eq!(classify(&e), Category::Other);

        // Also excluded for new bugs filed by the robot
        let e = event(LifecycleType::New, "NEW", "", &body);
        assert_ne!(classify(&e), Category::ScreenedOrNew);
    }

    #[test]
    fn test_whiteboard_edit_is_suspicious() {
        let e = event(LifecycleType::Changed, "NEW", "Whiteboard", "");
        assert_eq!(classify(&e), Category::SuspiciousOrReopen);
    }

    #[test]
    fn test_reopen() {
        let e = event(LifecycleType::Changed, "REOPENED", "Status Resolution", "");
        assert_eq!(classify(&e), Category::SuspiciousOrReopen);
    }

    #[test]
    fn test_reopen_pattern_matches_any_body() {
        // Known-loose heuristic: the empty alternative matches everything
        for body in ["", "Status: CLOSED -> REOPENED", "no relevant words at all"] {
            assert!(reopen_pattern().is_match(body));
        }
        let e = event(LifecycleType::Changed, "NEW", "Status", "unrelated text");
        assert_eq!(classify(&e), Category::SuspiciousOrReopen);
    }

    #[test]
    fn test_cc_change_without_comment_is_other() {
        let e = event(LifecycleType::Changed, "NEW", "CC", "");
        assert_eq!(classify(&e), Category::Other);
    }

    #[test]
    fn test_custom_rule_table() {
        let classifier = Classifier::new(vec![Rule {
            name: "everything-is-a-fix",
            category: Category::Fix,
            predicate: |_| true,
        }]);
        let e = event(LifecycleType::New, "NEW", "", "");
        assert_eq!(classifier.classify(&e, EvaluationTier::Gold), Category::Fix);
        assert_eq!(Classifier::new(vec![]).classify(&e, EvaluationTier::Gold), Category::Other);
    }

    #[test]
    fn test_foreign_notification_type_is_other() {
        let dep = LifecycleType::Other("dep_changed".to_string());
        let e = event(dep.clone(), "RESOLVED", "Status Resolution Whiteboard", "");
        assert_eq!(classify(&e), Category::Other);
        let e = event(dep, "NEW", "", "--- Comment #1 from Dev ---");
        assert_eq!(classify(&e), Category::Other);
    }

    fn lifecycle() -> impl Strategy<Value = LifecycleType> {
        prop_oneof![
            Just(LifecycleType::New),
            Just(LifecycleType::Changed),
            Just(LifecycleType::Other("dep_changed".to_string())),
        ]
    }

    fn status() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("NEW"),
            Just("ASSIGNED"),
            Just("NEEDINFO"),
            Just("REOPENED"),
            Just("RESOLVED"),
            Just("CLOSED"),
        ]
    }

    fn fields() -> impl Strategy<Value = Vec<&'static str>> {
        proptest::sample::subsequence(vec!["Status", "Resolution", "Whiteboard", "CC", "Priority"], 0..=5)
    }

    fn body() -> impl Strategy<Value = String> {
        (any::<bool>(), any::<bool>(), "[a-zA-Z ]{0,20}").prop_map(|(comment, robot, text)| {
            let mut body = text;
            if comment {
                body.push_str("\n--- Comment #2 from someone ---\n");
            }
            if robot {
                body.push_str(AUTOMATED_MARKER);
            }
            body
        })
    }

    proptest! {
        #[test]
        fn prop_classification_follows_first_matching_rule(
            lc in lifecycle(),
            st in status(),
            fs in fields(),
            text in body(),
        ) {
            let e = event(lc, st, &fs.join(" "), &text);
            let classifier = Classifier::default();
            let category = classifier.classify(&e, EvaluationTier::None);

            let matching: Vec<Category> = classifier
                .rules()
                .iter()
                .filter(|r| (r.predicate)(&e))
                .map(|r| r.category)
                .collect();

            match matching.first() {
                Some(first) => {
                    prop_assert_eq!(category, *first);
                }
                None => {
                    prop_assert_eq!(category, Category::Other);
                }
            }
            if is_fix(&e) {
                prop_assert_eq!(category, Category::Fix);
            }
            if is_automated(&e) {
                prop_assert_ne!(category, Category::ScreenedOrNew);
            }
        }
    }
}
