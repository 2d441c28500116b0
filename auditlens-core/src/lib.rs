//! auditlens-core - rule-based photo audit orchestration engine.
//!
//! Audits batches of photos against configurable visual rules (minimum face
//! count, required text, required labels), flags near-duplicate
//! resubmissions via perceptual fingerprints, and emits one durable verdict
//! plus one append-only audit row per photo.
//!
//! External collaborators (object storage, the vision classifier, verdict
//! persistence, rule loading) are consumed through narrow async traits;
//! in-memory and HTTP implementations ship alongside them.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use auditlens_core::{
//!     AuditPipeline, CheckSpec, MemoryObjectStore, MemoryVerdictStore,
//!     MockClassifier, PipelineConfig, Rule, RunRequest, StaticRules,
//! };
//!
//! # async fn example() -> auditlens_core::Result<()> {
//! let objects = Arc::new(MemoryObjectStore::new());
//! objects.insert("store1/2026-08-24/photo.jpg", vec![/* image bytes */]);
//!
//! let pipeline = AuditPipeline::new(
//!     objects,
//!     Arc::new(MockClassifier::new().with_faces(2)),
//!     Arc::new(MemoryVerdictStore::new()),
//!     Arc::new(StaticRules::new(vec![Rule::new(
//!         "rule_cre_group",
//!         CheckSpec::FaceCount { min_faces: 2 },
//!     )])),
//!     PipelineConfig::default(),
//! );
//!
//! let result = pipeline
//!     .run(RunRequest::new("store1/2026-08-24/", "rule_cre_group"))
//!     .await?;
//! assert_eq!(result.processed, result.results.len());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod dedup;
pub mod error;
pub mod evaluate;
pub mod fingerprint;
pub mod pipeline;
pub mod rules;
pub mod store;
pub mod verdict;

// Re-export main types for convenience
pub use classify::{
    Classification, HttpVisionClassifier, Label, MockClassifier, VisionClassifier,
    VisionHttpConfig,
};
pub use dedup::{is_duplicate, DuplicatePolicy};
pub use error::{AuditError, Result};
pub use evaluate::{evaluate, Evaluation};
pub use fingerprint::{Fingerprint, Fingerprinter, FINGERPRINT_SIZE};
pub use pipeline::{AuditPipeline, PipelineConfig, RunRequest};
pub use rules::{CheckSpec, JsonRuleFile, Rule, RuleSet, RuleSetProvider, StaticRules};
pub use store::{
    AuditRecord, HttpObjectStore, ImageRecord, MemoryObjectStore, MemoryVerdictStore,
    ObjectHttpConfig, ObjectMeta, ObjectStore, VerdictStore,
};
pub use verdict::{ItemVerdict, RunResult, VerdictStatus};
