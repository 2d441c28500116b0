//! Rule evaluation against classifier output.
//!
//! Dispatches strictly on the rule's check kind and makes exactly one
//! classification call per evaluation. Classifier failure becomes an ERROR
//! outcome here; it never propagates to the orchestrator as a fault.

use tracing::debug;

use crate::classify::{Classification, VisionClassifier};
use crate::error::AuditError;
use crate::rules::{CheckSpec, Rule};
use crate::verdict::VerdictStatus;

/// Outcome of evaluating one rule against one image.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub status: VerdictStatus,
    pub reason: Option<String>,
    /// What the classifier reported, when a classification ran successfully.
    pub classification: Option<Classification>,
}

impl Evaluation {
    fn pass(classification: Classification) -> Self {
        Self {
            status: VerdictStatus::Pass,
            reason: None,
            classification: Some(classification),
        }
    }

    fn fail(reason: String, classification: Classification) -> Self {
        Self {
            status: VerdictStatus::Fail,
            reason: Some(reason),
            classification: Some(classification),
        }
    }

    fn review(reason: String) -> Self {
        Self {
            status: VerdictStatus::Review,
            reason: Some(reason),
            classification: None,
        }
    }

    fn error(err: AuditError) -> Self {
        // Embed the underlying cause, not the error envelope.
        let cause = match err {
            AuditError::Classification(msg) => msg,
            other => other.to_string(),
        };
        Self {
            status: VerdictStatus::Error,
            reason: Some(format!("classification_error:{cause}")),
            classification: None,
        }
    }

    /// Detected face count, when a face classification ran.
    pub fn face_count(&self) -> Option<u32> {
        match self.classification {
            Some(Classification::Faces(n)) => Some(n),
            _ => None,
        }
    }
}

/// Evaluate `rule` against `image` using `classifier`.
///
/// An absent rule yields REVIEW `no_rule_found`; an unsupported kind yields
/// REVIEW `unsupported_rule_type:<kind>`. Neither makes a classifier call.
pub async fn evaluate(
    rule: Option<&Rule>,
    classifier: &dyn VisionClassifier,
    image: &[u8],
) -> Evaluation {
    let Some(rule) = rule else {
        return Evaluation::review("no_rule_found".into());
    };

    debug!(rule_id = %rule.id, kind = rule.check.kind(), "Evaluating rule");

    match &rule.check {
        CheckSpec::FaceCount { min_faces } => match classifier.detect_faces(image).await {
            Ok(faces) => {
                if faces >= *min_faces {
                    Evaluation::pass(Classification::Faces(faces))
                } else {
                    Evaluation::fail(
                        format!("face_count_{faces}_lt_{min_faces}"),
                        Classification::Faces(faces),
                    )
                }
            }
            Err(e) => Evaluation::error(e),
        },

        CheckSpec::TextMatch { expected_text } => match classifier.detect_text(image).await {
            Ok(texts) => {
                let expected = expected_text.to_uppercase();
                let haystack = texts
                    .iter()
                    .map(|t| t.to_uppercase())
                    .collect::<Vec<_>>()
                    .join(" ");
                if haystack.contains(&expected) {
                    Evaluation::pass(Classification::Texts(texts))
                } else {
                    Evaluation::fail(
                        format!("text_not_found_{expected}"),
                        Classification::Texts(texts),
                    )
                }
            }
            Err(e) => Evaluation::error(e),
        },

        CheckSpec::LabelCheck { expected_labels } => match classifier.detect_labels(image).await {
            Ok(labels) => {
                let detected: Vec<String> =
                    labels.iter().map(|l| l.name.to_uppercase()).collect();
                let all_present = expected_labels
                    .iter()
                    .all(|expected| detected.contains(&expected.to_uppercase()));
                if all_present {
                    Evaluation::pass(Classification::Labels(labels))
                } else {
                    Evaluation::fail("labels_missing".into(), Classification::Labels(labels))
                }
            }
            Err(e) => Evaluation::error(e),
        },

        CheckSpec::Unsupported { kind } => {
            Evaluation::review(format!("unsupported_rule_type:{kind}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MockClassifier;
    use crate::rules::Rule;

    fn face_rule(min_faces: u32) -> Rule {
        Rule::new("rule_face", CheckSpec::FaceCount { min_faces })
    }

    #[tokio::test]
    async fn face_count_passes_at_minimum() {
        let classifier = MockClassifier::new().with_faces(2);
        let eval = evaluate(Some(&face_rule(2)), &classifier, b"img").await;

        assert_eq!(eval.status, VerdictStatus::Pass);
        assert!(eval.reason.is_none());
        assert_eq!(eval.face_count(), Some(2));
    }

    #[tokio::test]
    async fn face_count_fails_below_minimum_with_counts_in_reason() {
        let classifier = MockClassifier::new().with_faces(1);
        let eval = evaluate(Some(&face_rule(2)), &classifier, b"img").await;

        assert_eq!(eval.status, VerdictStatus::Fail);
        assert_eq!(eval.reason.as_deref(), Some("face_count_1_lt_2"));
    }

    #[tokio::test]
    async fn text_match_is_case_insensitive_substring() {
        let rule = Rule::new(
            "rule_signage",
            CheckSpec::TextMatch {
                expected_text: "POP IN".into(),
            },
        );

        let classifier = MockClassifier::new().with_text(vec!["welcome", "pop in today"]);
        let eval = evaluate(Some(&rule), &classifier, b"img").await;
        assert_eq!(eval.status, VerdictStatus::Pass);

        let classifier = MockClassifier::new().with_text(vec!["welcome"]);
        let eval = evaluate(Some(&rule), &classifier, b"img").await;
        assert_eq!(eval.status, VerdictStatus::Fail);
        assert_eq!(eval.reason.as_deref(), Some("text_not_found_POP IN"));
    }

    #[tokio::test]
    async fn label_check_requires_every_expected_label() {
        let rule = Rule::new(
            "rule_poster",
            CheckSpec::LabelCheck {
                expected_labels: vec!["Sign".into(), "Poster".into()],
            },
        );

        let classifier = MockClassifier::new().with_labels(vec!["Sign"]);
        let eval = evaluate(Some(&rule), &classifier, b"img").await;
        assert_eq!(eval.status, VerdictStatus::Fail);
        assert_eq!(eval.reason.as_deref(), Some("labels_missing"));

        let classifier = MockClassifier::new().with_labels(vec!["Sign", "Poster", "Extra"]);
        let eval = evaluate(Some(&rule), &classifier, b"img").await;
        assert_eq!(eval.status, VerdictStatus::Pass);
    }

    #[tokio::test]
    async fn label_comparison_ignores_case() {
        let rule = Rule::new(
            "rule_poster",
            CheckSpec::LabelCheck {
                expected_labels: vec!["sign".into()],
            },
        );
        let classifier = MockClassifier::new().with_labels(vec!["SIGN"]);
        let eval = evaluate(Some(&rule), &classifier, b"img").await;
        assert_eq!(eval.status, VerdictStatus::Pass);
    }

    #[tokio::test]
    async fn absent_rule_is_review_not_error() {
        let classifier = MockClassifier::new();
        let eval = evaluate(None, &classifier, b"img").await;

        assert_eq!(eval.status, VerdictStatus::Review);
        assert_eq!(eval.reason.as_deref(), Some("no_rule_found"));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn unsupported_kind_is_review_without_classifier_call() {
        let rule = Rule::new(
            "rule_x",
            CheckSpec::Unsupported {
                kind: "ShelfShare".into(),
            },
        );
        let classifier = MockClassifier::new();
        let eval = evaluate(Some(&rule), &classifier, b"img").await;

        assert_eq!(eval.status, VerdictStatus::Review);
        assert_eq!(
            eval.reason.as_deref(),
            Some("unsupported_rule_type:ShelfShare")
        );
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn classifier_failure_becomes_error_status() {
        let classifier = MockClassifier::new().failing("throttled by upstream");
        let eval = evaluate(Some(&face_rule(1)), &classifier, b"img").await;

        assert_eq!(eval.status, VerdictStatus::Error);
        let reason = eval.reason.unwrap();
        assert!(reason.starts_with("classification_error:"));
        assert!(reason.contains("throttled by upstream"));
    }

    #[tokio::test]
    async fn exactly_one_classification_call_per_evaluation() {
        let classifier = MockClassifier::new().with_faces(3);
        evaluate(Some(&face_rule(1)), &classifier, b"img").await;
        assert_eq!(classifier.calls(), 1);
    }
}
