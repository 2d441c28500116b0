//! Storage collaborator contracts.
//!
//! Two narrow interfaces: [`ObjectStore`] lists and fetches the photos under
//! audit, [`VerdictStore`] persists the outcome. Both are implemented
//! externally; the engine only relies on the contracts spelled out here.
//!
//! Persistence semantics:
//! - image records are an **upsert** keyed by object key - reprocessing a key
//!   overwrites the prior record
//! - audit records are **append-only** - every processing attempt adds a row

pub mod http;
pub mod memory;

pub use http::{HttpObjectStore, ObjectHttpConfig};
pub use memory::{MemoryObjectStore, MemoryVerdictStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::Classification;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::verdict::VerdictStatus;

/// One object to audit, as produced by listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Opaque, path-like object key. Also the dedup-partition prefix source
    /// and the upsert key for the image record.
    pub key: String,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: u64,
}

/// Durable record of one audited image, keyed by object key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub key: String,
    pub file_url: Option<String>,
    pub rule_id: String,
    pub store_id: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub processed_at: DateTime<Utc>,
    /// Hex-encoded perceptual fingerprint; None when fingerprinting failed.
    pub fingerprint: Option<String>,
    /// Typed classifier output, when a classification ran.
    pub classification: Option<Classification>,
    /// Detected face count, when a FaceCount rule ran.
    pub face_count: Option<u32>,
    pub is_duplicate: bool,
}

/// One append-only audit trail row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub rule_id: String,
    pub key: String,
    pub status: VerdictStatus,
    pub reason: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Listing and fetching of photos under audit.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects under a key prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Download one object's bytes.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}

/// Persistent storage of verdicts and the audit trail.
///
/// Implementations must be safe for concurrent upsert/append calls; workers
/// persist from multiple tasks at once.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    /// Insert or overwrite the image record for `record.key`.
    async fn upsert_image(&self, record: &ImageRecord) -> Result<()>;

    /// Append one audit trail row.
    async fn append_audit(&self, record: &AuditRecord) -> Result<()>;

    /// Fingerprints of images under `partition_prefix` processed within the
    /// last `window_days` days.
    async fn recent_fingerprints(
        &self,
        partition_prefix: &str,
        window_days: i64,
    ) -> Result<Vec<Fingerprint>>;
}
