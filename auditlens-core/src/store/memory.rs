//! In-memory storage collaborators for testing.
//!
//! Used by core pipeline tests and server API tests; not suitable for
//! production use.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{AuditRecord, ImageRecord, ObjectMeta, ObjectStore, VerdictStore};
use crate::error::{AuditError, Result};
use crate::fingerprint::Fingerprint;

struct StoredObject {
    bytes: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// In-memory object store with per-key fetch failure injection.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_keys: Mutex<HashSet<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object with the current time as its last-modified stamp.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.insert_at(key, bytes, Utc::now());
    }

    /// Insert an object with an explicit last-modified stamp.
    pub fn insert_at(&self, key: impl Into<String>, bytes: Vec<u8>, last_modified: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            key.into(),
            StoredObject {
                bytes,
                last_modified,
            },
        );
    }

    /// Make every fetch of `key` fail. The key still appears in listings.
    pub fn fail_fetch(&self, key: impl Into<String>) {
        self.failing_keys.lock().unwrap().insert(key.into());
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, stored)| ObjectMeta {
                key: key.clone(),
                last_modified: Some(stored.last_modified),
                size: stored.bytes.len() as u64,
            })
            .collect())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(AuditError::Fetch(format!("injected failure for {key}")));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|stored| stored.bytes.clone())
            .ok_or_else(|| AuditError::NotFound(key.to_string()))
    }
}

/// In-memory verdict store with upsert/append semantics and persistence
/// failure injection.
#[derive(Default)]
pub struct MemoryVerdictStore {
    images: Mutex<HashMap<String, ImageRecord>>,
    audits: Mutex<Vec<AuditRecord>>,
    fail_persistence: AtomicBool,
}

impl MemoryVerdictStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert and append fail from now on.
    pub fn fail_persistence(&self) {
        self.fail_persistence.store(true, Ordering::SeqCst);
    }

    /// Seed a prior image record carrying only a fingerprint, as dedup input.
    pub fn seed_fingerprint(
        &self,
        key: impl Into<String>,
        fingerprint: &Fingerprint,
        processed_at: DateTime<Utc>,
    ) {
        let key = key.into();
        let record = ImageRecord {
            key: key.clone(),
            file_url: None,
            rule_id: String::new(),
            store_id: None,
            captured_at: None,
            processed_at,
            fingerprint: Some(fingerprint.to_hex()),
            classification: None,
            face_count: None,
            is_duplicate: false,
        };
        self.images.lock().unwrap().insert(key, record);
    }

    /// The stored image record for `key`, if any.
    pub fn image(&self, key: &str) -> Option<ImageRecord> {
        self.images.lock().unwrap().get(key).cloned()
    }

    pub fn image_count(&self) -> usize {
        self.images.lock().unwrap().len()
    }

    /// Snapshot of all audit rows, in append order.
    pub fn audits(&self) -> Vec<AuditRecord> {
        self.audits.lock().unwrap().clone()
    }

    /// Audit rows for one object key, in append order.
    pub fn audits_for(&self, key: &str) -> Vec<AuditRecord> {
        self.audits
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.key == key)
            .cloned()
            .collect()
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_persistence.load(Ordering::SeqCst) {
            return Err(AuditError::Persistence("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl VerdictStore for MemoryVerdictStore {
    async fn upsert_image(&self, record: &ImageRecord) -> Result<()> {
        self.check_failure()?;
        self.images
            .lock()
            .unwrap()
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        self.check_failure()?;
        self.audits.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn recent_fingerprints(
        &self,
        partition_prefix: &str,
        window_days: i64,
    ) -> Result<Vec<Fingerprint>> {
        let cutoff = Utc::now() - Duration::days(window_days);
        let images = self.images.lock().unwrap();
        let mut fingerprints = Vec::new();
        for record in images.values() {
            if !record.key.starts_with(partition_prefix) || record.processed_at < cutoff {
                continue;
            }
            if let Some(hex) = &record.fingerprint {
                fingerprints.push(Fingerprint::from_hex(hex)?);
            }
        }
        Ok(fingerprints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_prefix_in_key_order() {
        let store = MemoryObjectStore::new();
        store.insert("store1/2026-01-01/b.jpg", vec![1]);
        store.insert("store1/2026-01-01/a.jpg", vec![2]);
        store.insert("store2/2026-01-01/c.jpg", vec![3]);

        let listed = store.list("store1/").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["store1/2026-01-01/a.jpg", "store1/2026-01-01/b.jpg"]);
    }

    #[tokio::test]
    async fn fetch_missing_is_not_found() {
        let store = MemoryObjectStore::new();
        assert!(matches!(
            store.fetch("nope").await,
            Err(AuditError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn injected_fetch_failure() {
        let store = MemoryObjectStore::new();
        store.insert("k", vec![1, 2, 3]);
        store.fail_fetch("k");
        assert!(matches!(store.fetch("k").await, Err(AuditError::Fetch(_))));
    }

    #[tokio::test]
    async fn recent_fingerprints_respects_partition_and_window() {
        let store = MemoryVerdictStore::new();
        let fp = Fingerprint::from_bytes(vec![0xAB; 8]);

        store.seed_fingerprint("store1/2026-01-01/a.jpg", &fp, Utc::now());
        store.seed_fingerprint("store2/2026-01-01/b.jpg", &fp, Utc::now());
        store.seed_fingerprint(
            "store1/2025-01-01/old.jpg",
            &fp,
            Utc::now() - Duration::days(90),
        );

        let priors = store.recent_fingerprints("store1/", 30).await.unwrap();
        assert_eq!(priors.len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_injection() {
        let store = MemoryVerdictStore::new();
        store.fail_persistence();

        let record = AuditRecord {
            run_id: uuid::Uuid::new_v4(),
            rule_id: "r".into(),
            key: "k".into(),
            status: crate::verdict::VerdictStatus::Pass,
            reason: None,
            processed_at: Utc::now(),
        };
        assert!(matches!(
            store.append_audit(&record).await,
            Err(AuditError::Persistence(_))
        ));
    }
}
