//! Batch audit orchestration.
//!
//! Drives a run over every object under a key prefix: fetch, fingerprint,
//! classify, evaluate, dedup-check, persist. Work fans out under a fixed
//! concurrency bound; each item is isolated so one bad photo never aborts
//! the batch. Only pre-flight failures (unknown rule id, inaccessible
//! listing) fail the run itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::classify::VisionClassifier;
use crate::dedup::{is_duplicate, DuplicatePolicy};
use crate::error::{AuditError, Result};
use crate::evaluate::evaluate;
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::rules::{Rule, RuleSetProvider};
use crate::store::{AuditRecord, ImageRecord, ObjectMeta, ObjectStore, VerdictStore};
use crate::verdict::{ItemVerdict, RunResult, VerdictStatus};

/// Tunables for a pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of items in flight at once. The concurrency bound is
    /// also the backpressure mechanism toward the rate-limited classifier.
    pub concurrency: usize,
    /// Maximum Hamming distance at which two fingerprints count as
    /// near-duplicates.
    pub dedup_threshold: u32,
    /// Recency window, in days, for both listed-object filtering and prior
    /// fingerprints.
    pub recent_window_days: i64,
    /// What a duplicate match does to the item's verdict.
    pub duplicate_policy: DuplicatePolicy,
    /// Independent timeout applied around each fetch and persist call.
    /// Classifier calls carry their own client-level timeout.
    pub call_timeout: Duration,
    /// Prefix for synthesized `file_url` values on image records,
    /// e.g. `s3://audit-photos`.
    pub object_url_prefix: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 6,
            dedup_threshold: 10,
            recent_window_days: 30,
            duplicate_policy: DuplicatePolicy::default(),
            call_timeout: Duration::from_secs(15),
            object_url_prefix: None,
        }
    }
}

/// Parameters of one audit run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunRequest {
    /// Object key prefix to audit, e.g. `store123/2026-08-24/`.
    pub prefix: String,
    /// Rule to evaluate; must exist in the loaded rule set.
    pub rule_id: String,
    #[serde(default)]
    pub store_id: Option<String>,
    /// Dedup partition prefix; defaults to `prefix`. Duplicate detection
    /// never crosses partitions.
    #[serde(default)]
    pub partition_hint: Option<String>,
}

impl RunRequest {
    pub fn new(prefix: impl Into<String>, rule_id: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            rule_id: rule_id.into(),
            store_id: None,
            partition_hint: None,
        }
    }
}

/// Read-only context shared by all workers of one run.
struct RunShared {
    run_id: Uuid,
    rule: Rule,
    store_id: Option<String>,
    /// Prior fingerprints for the partition, captured once before fan-out.
    /// Not refreshed mid-run: items of the same run are not cross-detected
    /// against each other, only against pre-existing history.
    priors: Vec<Fingerprint>,
}

/// The audit orchestration engine.
#[derive(Clone)]
pub struct AuditPipeline {
    objects: Arc<dyn ObjectStore>,
    classifier: Arc<dyn VisionClassifier>,
    store: Arc<dyn VerdictStore>,
    rules: Arc<dyn RuleSetProvider>,
    fingerprinter: Fingerprinter,
    config: PipelineConfig,
}

impl AuditPipeline {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        classifier: Arc<dyn VisionClassifier>,
        store: Arc<dyn VerdictStore>,
        rules: Arc<dyn RuleSetProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            objects,
            classifier,
            store,
            rules,
            fingerprinter: Fingerprinter::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one audit batch.
    ///
    /// Returns a complete [`RunResult`] with exactly one verdict per listed
    /// item, in listing order. Fails only before fan-out: an unknown rule id
    /// or a failed listing aborts the run with no per-item processing.
    ///
    /// Listed objects older than the recency window are dropped before
    /// fan-out. Objects without a last-modified stamp are kept: they cannot
    /// be proven stale, and dropping them would silently skip gateways that
    /// omit the field.
    ///
    /// Cancelling (dropping) this future abandons the aggregated result but
    /// not the work: items already in flight still run to a terminal state
    /// and persist their image record and audit row.
    #[instrument(level = "info", skip(self, request), fields(prefix = %request.prefix, rule_id = %request.rule_id))]
    pub async fn run(&self, request: RunRequest) -> Result<RunResult> {
        let rule_set = self.rules.load().await?;
        let rule = rule_set
            .get(&request.rule_id)
            .cloned()
            .ok_or_else(|| AuditError::UnknownRule(request.rule_id.clone()))?;

        let mut objects = self.objects.list(&request.prefix).await?;
        let cutoff = Utc::now() - chrono::Duration::days(self.config.recent_window_days);
        objects.retain(|meta| meta.last_modified.map(|t| t >= cutoff).unwrap_or(true));

        let partition = request
            .partition_hint
            .as_deref()
            .unwrap_or(&request.prefix);
        let priors = match self
            .store
            .recent_fingerprints(partition, self.config.recent_window_days)
            .await
        {
            Ok(priors) => priors,
            Err(e) => {
                // Dedup degrades gracefully; the rule verdicts still stand.
                warn!(error = %e, partition, "Failed to load prior fingerprints, dedup disabled for run");
                Vec::new()
            }
        };

        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            items = objects.len(),
            priors = priors.len(),
            "Starting audit run"
        );

        let shared = Arc::new(RunShared {
            run_id,
            rule,
            store_id: request.store_id.clone(),
            priors,
        });

        let keys: Vec<String> = objects.iter().map(|meta| meta.key.clone()).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        // Workers are spawned detached: dropping this future (caller timeout,
        // client disconnect) must not abort an item between its image upsert
        // and its audit row. In-flight items run to a terminal state; only
        // the aggregation below is cancelled.
        let mut workers = Vec::with_capacity(keys.len());
        for meta in objects {
            let pipeline = self.clone();
            let shared = Arc::clone(&shared);
            let semaphore = Arc::clone(&semaphore);

            workers.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return error_verdict(meta.key, "worker_aborted".to_string());
                };
                pipeline.process_item(&shared, meta).await
            }));
        }

        let mut results: Vec<ItemVerdict> = Vec::with_capacity(workers.len());
        for (index, handle) in workers.into_iter().enumerate() {
            match handle.await {
                Ok(verdict) => results.push(verdict),
                Err(e) => {
                    // The one-verdict-per-item invariant survives a panic.
                    tracing::error!(error = %e, "Audit worker panicked");
                    results.push(error_verdict(
                        keys[index].clone(),
                        "worker_panic".to_string(),
                    ));
                }
            }
        }

        info!(run_id = %run_id, processed = results.len(), "Audit run complete");

        Ok(RunResult {
            run_id,
            prefix: request.prefix,
            rule_id: request.rule_id,
            store_id: request.store_id,
            processed: results.len(),
            results,
        })
    }

    /// Process one work item end to end. Never returns an error: every
    /// failure is folded into the item's verdict.
    async fn process_item(&self, shared: &RunShared, meta: ObjectMeta) -> ItemVerdict {
        let key = meta.key.clone();
        let processed_at = Utc::now();

        let bytes = match self.with_timeout(self.objects.fetch(&key)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let reason = format!("download_error:{}", error_cause(&e));
                warn!(key, error = %e, "Download failed");
                self.append_audit_best_effort(shared, &key, VerdictStatus::Error, Some(&reason))
                    .await;
                return error_verdict(key, reason);
            }
        };

        let fingerprint = match self.fingerprinter.hash_bytes(&bytes) {
            Ok(fp) => Some(fp),
            Err(e) => {
                // Not fatal: the item still gets a rule verdict, just no
                // duplicate detection.
                warn!(key, error = %e, "Fingerprinting failed, skipping dedup for item");
                None
            }
        };

        let eval = evaluate(Some(&shared.rule), self.classifier.as_ref(), &bytes).await;

        let is_dup = fingerprint
            .as_ref()
            .map(|fp| is_duplicate(fp, &shared.priors, self.config.dedup_threshold))
            .unwrap_or(false);

        let (mut status, mut reason) = if is_dup {
            match self.config.duplicate_policy {
                DuplicatePolicy::OverrideToFail => {
                    let reason = match &eval.reason {
                        Some(r) => format!("{r}|repeated"),
                        None => "repeated".to_string(),
                    };
                    (VerdictStatus::Fail, Some(reason))
                }
                DuplicatePolicy::FlagOnly => (eval.status, eval.reason.clone()),
            }
        } else {
            (eval.status, eval.reason.clone())
        };

        let record = ImageRecord {
            key: key.clone(),
            file_url: self
                .config
                .object_url_prefix
                .as_ref()
                .map(|prefix| format!("{prefix}/{key}")),
            rule_id: shared.rule.id.clone(),
            store_id: shared.store_id.clone(),
            captured_at: meta.last_modified,
            processed_at,
            fingerprint: fingerprint.as_ref().map(Fingerprint::to_hex),
            classification: eval.classification.clone(),
            face_count: eval.face_count(),
            is_duplicate: is_dup,
        };

        if let Err(e) = self.with_timeout(self.store.upsert_image(&record)).await {
            warn!(key, error = %e, "Image record upsert failed");
            status = VerdictStatus::Error;
            reason = Some(format!("persistence_error:{}", error_cause(&e)));
        }

        self.append_audit_best_effort(shared, &key, status, reason.as_deref())
            .await;

        ItemVerdict {
            key,
            status,
            reason,
            is_duplicate: is_dup,
        }
    }

    /// Append an audit row; a failed append is logged, never fatal.
    async fn append_audit_best_effort(
        &self,
        shared: &RunShared,
        key: &str,
        status: VerdictStatus,
        reason: Option<&str>,
    ) {
        let record = AuditRecord {
            run_id: shared.run_id,
            rule_id: shared.rule.id.clone(),
            key: key.to_string(),
            status,
            reason: reason.map(String::from),
            processed_at: Utc::now(),
        };
        if let Err(e) = self.with_timeout(self.store.append_audit(&record)).await {
            warn!(key, error = %e, "Audit row append failed");
        }
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AuditError::Timeout(self.config.call_timeout)),
        }
    }
}

fn error_verdict(key: String, reason: String) -> ItemVerdict {
    ItemVerdict {
        key,
        status: VerdictStatus::Error,
        reason: Some(reason),
        is_duplicate: false,
    }
}

/// The underlying cause of an error, without the variant envelope. Used when
/// embedding causes into reason codes.
fn error_cause(err: &AuditError) -> String {
    match err {
        AuditError::Fetch(msg)
        | AuditError::Listing(msg)
        | AuditError::Fingerprint(msg)
        | AuditError::Classification(msg)
        | AuditError::Persistence(msg)
        | AuditError::RuleSet(msg) => msg.clone(),
        AuditError::NotFound(key) => format!("not_found:{key}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.dedup_threshold, 10);
        assert_eq!(config.recent_window_days, 30);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::OverrideToFail);
    }

    #[test]
    fn run_request_deserializes_with_optional_fields() {
        let request: RunRequest =
            serde_json::from_str(r#"{"prefix": "store1/", "rule_id": "rule_face"}"#).unwrap();
        assert_eq!(request.prefix, "store1/");
        assert!(request.store_id.is_none());
        assert!(request.partition_hint.is_none());
    }

    #[test]
    fn error_cause_strips_envelope() {
        assert_eq!(
            error_cause(&AuditError::Fetch("connection reset".into())),
            "connection reset"
        );
        assert_eq!(
            error_cause(&AuditError::NotFound("store1/a.jpg".into())),
            "not_found:store1/a.jpg"
        );
    }
}
