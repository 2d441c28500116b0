//! Verdict and run result types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome assigned to one audited image. Never revised after
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Pass,
    Fail,
    Review,
    Error,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Review => "REVIEW",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VerdictStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            "REVIEW" => Ok(Self::Review),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("Unknown verdict status: {other}")),
        }
    }
}

/// Per-item verdict returned in a run result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemVerdict {
    /// Object key this verdict belongs to.
    pub key: String,
    pub status: VerdictStatus,
    /// Machine-readable reason code, e.g. `face_count_1_lt_2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub is_duplicate: bool,
}

/// Aggregate result of one audit run. Built once, never further mutated.
///
/// `results` is in listing (submission) order and always has one entry per
/// listed work item, including items that ended in ERROR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique identifier generated once per run; shared by all audit rows.
    pub run_id: Uuid,
    /// Object key prefix this run covered.
    pub prefix: String,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Total number of items considered.
    pub processed: usize,
    pub results: Vec<ItemVerdict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&VerdictStatus::Pass).unwrap(),
            "\"PASS\""
        );
        assert_eq!(
            serde_json::to_string(&VerdictStatus::Error).unwrap(),
            "\"ERROR\""
        );
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            VerdictStatus::Pass,
            VerdictStatus::Fail,
            VerdictStatus::Review,
            VerdictStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<VerdictStatus>().unwrap(), status);
        }
        assert!("MAYBE".parse::<VerdictStatus>().is_err());
    }

    #[test]
    fn reason_is_omitted_when_absent() {
        let verdict = ItemVerdict {
            key: "store1/2026-01-01/a.jpg".into(),
            status: VerdictStatus::Pass,
            reason: None,
            is_duplicate: false,
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert!(json.get("reason").is_none());
    }
}
