//! Mock vision classifier for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{Label, VisionClassifier};
use crate::error::{AuditError, Result};

/// Scripted classifier for tests.
///
/// Returns fixed responses regardless of image content, with optional
/// per-call delay and failure injection. Tracks the number of calls and the
/// peak number of concurrently in-flight calls so tests can assert the
/// orchestrator's concurrency bound.
#[derive(Default)]
pub struct MockClassifier {
    faces: u32,
    texts: Vec<String>,
    labels: Vec<Label>,
    delay: Option<Duration>,
    failure: Option<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report this many faces from `detect_faces`.
    pub fn with_faces(mut self, faces: u32) -> Self {
        self.faces = faces;
        self
    }

    /// Report these fragments from `detect_text`.
    pub fn with_text(mut self, texts: Vec<&str>) -> Self {
        self.texts = texts.into_iter().map(Into::into).collect();
        self
    }

    /// Report these labels from `detect_labels`, all at fixed confidence.
    pub fn with_labels(mut self, names: Vec<&str>) -> Self {
        self.labels = names
            .into_iter()
            .map(|name| Label {
                name: name.into(),
                confidence: 99.0,
            })
            .collect();
        self
    }

    /// Sleep this long inside every call, to widen the in-flight window.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with this message.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Total number of classification calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<InFlightGuard<'_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlightGuard { mock: self };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(AuditError::Classification(message.clone()));
        }
        Ok(guard)
    }
}

struct InFlightGuard<'a> {
    mock: &'a MockClassifier,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.mock.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VisionClassifier for MockClassifier {
    async fn detect_faces(&self, _image: &[u8]) -> Result<u32> {
        let _guard = self.enter().await?;
        Ok(self.faces)
    }

    async fn detect_text(&self, _image: &[u8]) -> Result<Vec<String>> {
        let _guard = self.enter().await?;
        Ok(self.texts.clone())
    }

    async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<Label>> {
        let _guard = self.enter().await?;
        Ok(self.labels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses() {
        let mock = MockClassifier::new()
            .with_faces(2)
            .with_text(vec!["pop in today"])
            .with_labels(vec!["Sign"]);

        assert_eq!(mock.detect_faces(b"img").await.unwrap(), 2);
        assert_eq!(
            mock.detect_text(b"img").await.unwrap(),
            vec!["pop in today".to_string()]
        );
        assert_eq!(mock.detect_labels(b"img").await.unwrap()[0].name, "Sign");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn failure_injection() {
        let mock = MockClassifier::new().failing("throttled");
        let err = mock.detect_faces(b"img").await.unwrap_err();
        assert!(matches!(err, AuditError::Classification(_)));
        assert!(err.to_string().contains("throttled"));
    }

    #[tokio::test]
    async fn in_flight_counter_returns_to_zero() {
        let mock = MockClassifier::new().with_faces(1);
        mock.detect_faces(b"img").await.unwrap();
        mock.detect_faces(b"img").await.unwrap();

        // Sequential calls never overlap.
        assert_eq!(mock.peak_in_flight(), 1);
        assert_eq!(mock.in_flight.load(Ordering::SeqCst), 0);
    }
}
