//! Vision classification contracts.
//!
//! The engine never implements detection itself; it consumes the results of
//! an external vision service through the [`VisionClassifier`] trait. Each
//! rule kind maps to exactly one classifier call.
//!
//! ## Implementations
//!
//! - [`HttpVisionClassifier`] - JSON client for a remote vision service
//! - [`MockClassifier`] - scripted responses for tests

pub mod http;
pub mod mock;

pub use http::{HttpVisionClassifier, VisionHttpConfig};
pub use mock::MockClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A detected label with the service's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f32,
}

/// Typed classification result, tagged by the rule kind that requested it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Classification {
    /// Number of faces detected.
    Faces(u32),
    /// Detected text fragments, in detection order.
    Texts(Vec<String>),
    /// Detected labels with confidence.
    Labels(Vec<Label>),
}

/// External vision classification service.
///
/// Every call may fail transiently (throttling, timeout) or permanently
/// (malformed response); implementations surface both as
/// `AuditError::Classification` after any internal retrying.
#[async_trait]
pub trait VisionClassifier: Send + Sync {
    /// Count faces in the image.
    async fn detect_faces(&self, image: &[u8]) -> Result<u32>;

    /// Detect text fragments in the image.
    async fn detect_text(&self, image: &[u8]) -> Result<Vec<String>>;

    /// Detect labels (object/scene names) in the image.
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_serializes_tagged() {
        let faces = serde_json::to_value(Classification::Faces(3)).unwrap();
        assert_eq!(faces["kind"], "faces");
        assert_eq!(faces["value"], 3);

        let labels = serde_json::to_value(Classification::Labels(vec![Label {
            name: "Sign".into(),
            confidence: 98.2,
        }]))
        .unwrap();
        assert_eq!(labels["kind"], "labels");
        assert_eq!(labels["value"][0]["name"], "Sign");
    }

    #[test]
    fn classification_roundtrip() {
        let original = Classification::Texts(vec!["POP IN".into(), "WELCOME".into()]);
        let json = serde_json::to_string(&original).unwrap();
        let restored: Classification = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
    }
}
