//! Audit rule definitions and rule set loading.
//!
//! A rule is a named, typed visual check. Rule sets are loaded once per run
//! and treated as read-only configuration; there is no process-wide mutable
//! rule cache.
//!
//! The on-disk format is a JSON array of rule objects:
//!
//! ```json
//! [
//!   {
//!     "id": "rule_cre_group",
//!     "group": "Morning Meeting",
//!     "section": "CRE Morning Meeting",
//!     "norms": "CRE group photo must be submitted as per guideline",
//!     "visual_audit_type": "FaceCount",
//!     "min_faces": 2
//!   }
//! ]
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

/// The typed check a rule performs, dispatched exhaustively by the evaluator.
///
/// An unrecognized `visual_audit_type` is carried as `Unsupported` instead of
/// failing the load: a configuration gap surfaces as a REVIEW verdict at
/// evaluation time, never as a pipeline fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckSpec {
    /// At least `min_faces` faces must be detected.
    FaceCount { min_faces: u32 },
    /// `expected_text` must appear (case-insensitively) in the detected text.
    TextMatch { expected_text: String },
    /// Every expected label must appear among the detected label names.
    LabelCheck { expected_labels: Vec<String> },
    /// A kind this engine does not know how to evaluate.
    Unsupported { kind: String },
}

impl CheckSpec {
    /// The wire name of this check kind.
    pub fn kind(&self) -> &str {
        match self {
            Self::FaceCount { .. } => "FaceCount",
            Self::TextMatch { .. } => "TextMatch",
            Self::LabelCheck { .. } => "LabelCheck",
            Self::Unsupported { kind } => kind,
        }
    }
}

/// One audit rule: identifier, descriptive metadata, and the typed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRule", into = "RawRule")]
pub struct Rule {
    pub id: String,
    pub group: Option<String>,
    pub section: Option<String>,
    pub sub_section: Option<String>,
    pub norms: Option<String>,
    pub check: CheckSpec,
}

/// Wire shape of a rule entry. Kind-specific parameters are optional at this
/// layer; defaults are applied when converting to the typed form.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRule {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub_section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    norms: Option<String>,
    #[serde(default)]
    visual_audit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_faces: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_labels: Option<Vec<String>>,
}

impl From<RawRule> for Rule {
    fn from(raw: RawRule) -> Self {
        let check = match raw.visual_audit_type.as_deref() {
            Some("FaceCount") => CheckSpec::FaceCount {
                min_faces: raw.min_faces.unwrap_or(1),
            },
            Some("TextMatch") => CheckSpec::TextMatch {
                expected_text: raw.expected_text.unwrap_or_default(),
            },
            Some("LabelCheck") => CheckSpec::LabelCheck {
                expected_labels: raw.expected_labels.unwrap_or_default(),
            },
            Some(other) => CheckSpec::Unsupported { kind: other.into() },
            None => CheckSpec::Unsupported { kind: "none".into() },
        };

        Self {
            id: raw.id,
            group: raw.group,
            section: raw.section,
            sub_section: raw.sub_section,
            norms: raw.norms,
            check,
        }
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        let (visual_audit_type, min_faces, expected_text, expected_labels) = match rule.check {
            CheckSpec::FaceCount { min_faces } => {
                ("FaceCount".to_string(), Some(min_faces), None, None)
            }
            CheckSpec::TextMatch { expected_text } => {
                ("TextMatch".to_string(), None, Some(expected_text), None)
            }
            CheckSpec::LabelCheck { expected_labels } => {
                ("LabelCheck".to_string(), None, None, Some(expected_labels))
            }
            CheckSpec::Unsupported { kind } => (kind, None, None, None),
        };

        Self {
            id: rule.id,
            group: rule.group,
            section: rule.section,
            sub_section: rule.sub_section,
            norms: rule.norms,
            visual_audit_type: Some(visual_audit_type),
            min_faces,
            expected_text,
            expected_labels,
        }
    }
}

impl Rule {
    /// Convenience constructor for tests and embedded rule sets.
    pub fn new(id: impl Into<String>, check: CheckSpec) -> Self {
        Self {
            id: id.into(),
            group: None,
            section: None,
            sub_section: None,
            norms: None,
            check,
        }
    }
}

/// A read-only set of rules keyed by rule id.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<String, Rule>,
}

impl RuleSet {
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.get(rule_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule ids in stable (sorted) order, for introspection surfaces.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.rules.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }
}

/// Source of rule sets. Loaded once per run, never re-read per item.
#[async_trait]
pub trait RuleSetProvider: Send + Sync {
    async fn load(&self) -> Result<RuleSet>;
}

/// Loads rules from a JSON file.
///
/// A missing file yields an empty rule set (every run then fails fast with
/// an unknown-rule error, which is the observable symptom an operator can
/// act on). Entries that fail to parse are skipped with a warning.
pub struct JsonRuleFile {
    path: PathBuf,
}

impl JsonRuleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RuleSetProvider for JsonRuleFile {
    async fn load(&self) -> Result<RuleSet> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "Rules file not found, loading empty rule set");
                return Ok(RuleSet::default());
            }
            Err(e) => {
                return Err(AuditError::RuleSet(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let entries: Vec<serde_json::Value> = serde_json::from_slice(&raw)
            .map_err(|e| AuditError::RuleSet(format!("Invalid rules JSON: {}", e)))?;

        let mut rules = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<Rule>(entry) {
                Ok(rule) => rules.push(rule),
                Err(e) => tracing::warn!(error = %e, "Skipping malformed rule entry"),
            }
        }

        tracing::info!(count = rules.len(), path = %self.path.display(), "Loaded rule set");
        Ok(RuleSet::from_rules(rules))
    }
}

/// A fixed in-memory rule set, for tests and embedded configurations.
pub struct StaticRules {
    rules: RuleSet,
}

impl StaticRules {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: RuleSet::from_rules(rules),
        }
    }
}

#[async_trait]
impl RuleSetProvider for StaticRules {
    async fn load(&self) -> Result<RuleSet> {
        Ok(self.rules.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds() {
        let json = r#"[
            {"id": "rule_cre_group", "group": "Morning Meeting", "visual_audit_type": "FaceCount", "min_faces": 2},
            {"id": "rule_signage", "visual_audit_type": "TextMatch", "expected_text": "POP IN"},
            {"id": "rule_poster", "visual_audit_type": "LabelCheck", "expected_labels": ["Sign", "Poster"]}
        ]"#;

        let rules: Vec<Rule> = serde_json::from_str(json).unwrap();
        let set = RuleSet::from_rules(rules);

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.get("rule_cre_group").unwrap().check,
            CheckSpec::FaceCount { min_faces: 2 }
        );
        assert_eq!(
            set.get("rule_signage").unwrap().check,
            CheckSpec::TextMatch {
                expected_text: "POP IN".into()
            }
        );
        assert_eq!(
            set.get("rule_poster").unwrap().check,
            CheckSpec::LabelCheck {
                expected_labels: vec!["Sign".into(), "Poster".into()]
            }
        );
    }

    #[test]
    fn unknown_kind_becomes_unsupported() {
        let rule: Rule = serde_json::from_str(
            r#"{"id": "rule_x", "visual_audit_type": "ShelfShare", "min_faces": 3}"#,
        )
        .unwrap();

        assert_eq!(
            rule.check,
            CheckSpec::Unsupported {
                kind: "ShelfShare".into()
            }
        );
        assert_eq!(rule.check.kind(), "ShelfShare");
    }

    #[test]
    fn min_faces_defaults_to_one() {
        let rule: Rule =
            serde_json::from_str(r#"{"id": "rule_face", "visual_audit_type": "FaceCount"}"#)
                .unwrap();
        assert_eq!(rule.check, CheckSpec::FaceCount { min_faces: 1 });
    }

    #[test]
    fn serializes_back_to_wire_shape() {
        let rule = Rule::new("rule_face", CheckSpec::FaceCount { min_faces: 2 });
        let json = serde_json::to_value(&rule).unwrap();

        assert_eq!(json["visual_audit_type"], "FaceCount");
        assert_eq!(json["min_faces"], 2);
        assert!(json.get("expected_text").is_none());
    }

    #[test]
    fn ids_are_sorted() {
        let set = RuleSet::from_rules(vec![
            Rule::new("b", CheckSpec::FaceCount { min_faces: 1 }),
            Rule::new("a", CheckSpec::FaceCount { min_faces: 1 }),
        ]);
        assert_eq!(set.ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn static_provider_round_trips() {
        let provider = StaticRules::new(vec![Rule::new(
            "rule_face",
            CheckSpec::FaceCount { min_faces: 2 },
        )]);
        let set = provider.load().await.unwrap();
        assert!(set.get("rule_face").is_some());
        assert!(set.get("rule_missing").is_none());
    }

    #[tokio::test]
    async fn missing_rules_file_loads_empty() {
        let provider = JsonRuleFile::new("/nonexistent/rules.json");
        let set = provider.load().await.unwrap();
        assert!(set.is_empty());
    }
}
