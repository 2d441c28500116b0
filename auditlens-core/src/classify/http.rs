//! HTTP vision classifier client with retry and backoff.
//!
//! Talks to a vision detection service exposing JSON endpoints:
//!
//! - `POST /v1/detect/faces`  -> `{ "face_count": u32 }`
//! - `POST /v1/detect/text`   -> `{ "text_detections": [string] }`
//! - `POST /v1/detect/labels` -> `{ "labels": [{ "name": string, "confidence": f32 }] }`
//!
//! The request body is the raw image bytes. The service is rate limited;
//! throttling and transport hiccups are retried with exponential backoff,
//! everything else fails permanently.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Label, VisionClassifier};
use crate::error::{AuditError, Result};

/// Configuration for the vision service HTTP client.
#[derive(Debug, Clone)]
pub struct VisionHttpConfig {
    /// Service base URL, e.g. `https://vision.internal`.
    pub base_url: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
    /// Initial retry interval.
    pub initial_interval: Duration,
    /// Maximum retry interval.
    pub max_interval: Duration,
}

impl Default for VisionHttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8600".into(),
            api_key: None,
            timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
        }
    }
}

/// Vision service client.
pub struct HttpVisionClassifier {
    client: Client,
    config: VisionHttpConfig,
}

#[derive(Debug, Deserialize)]
struct FacesResponse {
    face_count: u32,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    #[serde(default)]
    text_detections: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

impl HttpVisionClassifier {
    /// Create a new classifier client.
    pub fn new(config: VisionHttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AuditError::Classification(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// POST image bytes to a detection endpoint with retry, parsing JSON.
    async fn detect<R>(&self, endpoint: &str, image: &[u8]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = format!("{}/v1/detect/{}", self.config.base_url, endpoint);
        let backoff = ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        };

        retry_notify(
            backoff,
            || async { self.detect_once::<R>(&url, endpoint, image).await },
            |err: AuditError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    async fn detect_once<R>(
        &self,
        url: &str,
        endpoint: &str,
        image: &[u8],
    ) -> std::result::Result<R, backoff::Error<AuditError>>
    where
        R: DeserializeOwned,
    {
        let start = Instant::now();

        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec());
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let latency_ms = start.elapsed().as_millis();
            if is_transient_error(&e) {
                warn!(error = %e, latency_ms = latency_ms as u64, "Transient error, will retry");
                backoff::Error::transient(AuditError::Classification(format!(
                    "Transient error (will retry): {e}"
                )))
            } else {
                warn!(error = %e, latency_ms = latency_ms as u64, "Permanent error, aborting");
                backoff::Error::permanent(AuditError::Classification(format!(
                    "{endpoint} request failed: {e}"
                )))
            }
        })?;

        let status = response.status();
        debug!(status = %status, endpoint, "Received classifier response");

        if !status.is_success() {
            let err =
                AuditError::Classification(format!("{endpoint} returned status: {status}"));
            return if is_transient_status(status) {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let parsed: R = response.json().await.map_err(|e| {
            backoff::Error::permanent(AuditError::Classification(format!(
                "Failed to parse {endpoint} response: {e}"
            )))
        })?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            endpoint, "Classification completed"
        );

        Ok(parsed)
    }
}

#[async_trait]
impl VisionClassifier for HttpVisionClassifier {
    async fn detect_faces(&self, image: &[u8]) -> Result<u32> {
        let resp: FacesResponse = self.detect("faces", image).await?;
        Ok(resp.face_count)
    }

    async fn detect_text(&self, image: &[u8]) -> Result<Vec<String>> {
        let resp: TextResponse = self.detect("text", image).await?;
        Ok(resp.text_detections)
    }

    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>> {
        let resp: LabelsResponse = self.detect("labels", image).await?;
        Ok(resp.labels)
    }
}

/// Check if a reqwest error is transient and should be retried.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Check if an HTTP status code indicates a transient error.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_status_codes() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn default_config_is_sane() {
        let config = VisionHttpConfig::default();
        assert_eq!(config.max_retries, 3);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn response_shapes_parse() {
        let faces: FacesResponse = serde_json::from_str(r#"{"face_count": 2}"#).unwrap();
        assert_eq!(faces.face_count, 2);

        let text: TextResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(text.text_detections.is_empty());

        let labels: LabelsResponse =
            serde_json::from_str(r#"{"labels": [{"name": "Sign", "confidence": 91.5}]}"#).unwrap();
        assert_eq!(labels.labels[0].name, "Sign");
    }
}
