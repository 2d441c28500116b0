//! Object-gateway HTTP client.
//!
//! Talks to an object storage gateway exposing two endpoints:
//!
//! - `GET /objects?prefix=<prefix>` -> JSON array of object metadata
//! - `GET /object?key=<key>`       -> raw object bytes (404 when absent)
//!
//! Listing is a single call; any pagination happens inside the gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{ObjectMeta, ObjectStore};
use crate::error::{AuditError, Result};

/// Configuration for the object gateway client.
#[derive(Debug, Clone)]
pub struct ObjectHttpConfig {
    /// Gateway base URL, e.g. `https://objects.internal`.
    pub base_url: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ObjectHttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8500".into(),
            api_key: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Object gateway client.
pub struct HttpObjectStore {
    client: Client,
    config: ObjectHttpConfig,
}

impl HttpObjectStore {
    pub fn new(config: ObjectHttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuditError::Fetch(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        request
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let url = format!("{}/objects", self.config.base_url);
        let response = self
            .get(&url)
            .query(&[("prefix", prefix)])
            .send()
            .await
            .map_err(|e| AuditError::Listing(format!("List request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::Listing(format!(
                "List returned status: {status}"
            )));
        }

        let objects: Vec<ObjectMeta> = response
            .json()
            .await
            .map_err(|e| AuditError::Listing(format!("Failed to parse listing: {e}")))?;

        debug!(prefix, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let url = format!("{}/object", self.config.base_url);
        let response = self
            .get(&url)
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|e| AuditError::Fetch(format!("Fetch request failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AuditError::NotFound(key.to_string())),
            status if !status.is_success() => Err(AuditError::Fetch(format!(
                "Fetch returned status: {status}"
            ))),
            _ => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| AuditError::Fetch(format!("Failed to read body: {e}")))?;
                debug!(key, size = bytes.len(), "Fetched object");
                Ok(bytes.to_vec())
            }
        }
    }
}
