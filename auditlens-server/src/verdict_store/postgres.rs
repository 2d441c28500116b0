//! PostgreSQL implementation of the verdict store.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use auditlens_core::{
    AuditError, AuditRecord, Fingerprint, ImageRecord, Result, VerdictStore,
};

/// PostgreSQL-backed verdict store.
///
/// Image records live in `images`, keyed by object key with upsert
/// semantics. Audit trail rows live in `audits` and are append-only.
#[derive(Clone)]
pub struct PostgresVerdictStore {
    pool: PgPool,
}

impl PostgresVerdictStore {
    /// Create a new verdict store with the given database URL.
    ///
    /// Runs migrations automatically on connection.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| AuditError::Persistence(format!("connection failed: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AuditError::Persistence(format!("migration failed: {e}")))?;

        tracing::info!("Verdict store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Create a verdict store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerdictStore for PostgresVerdictStore {
    async fn upsert_image(&self, record: &ImageRecord) -> Result<()> {
        let classification = record
            .classification
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| AuditError::Persistence(format!("classification encoding: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO images (
                object_key, file_url, rule_id, store_id, captured_at,
                processed_at, fingerprint, classification, face_count, is_duplicate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (object_key) DO UPDATE SET
                file_url = EXCLUDED.file_url,
                rule_id = EXCLUDED.rule_id,
                store_id = EXCLUDED.store_id,
                captured_at = EXCLUDED.captured_at,
                processed_at = EXCLUDED.processed_at,
                fingerprint = EXCLUDED.fingerprint,
                classification = EXCLUDED.classification,
                face_count = EXCLUDED.face_count,
                is_duplicate = EXCLUDED.is_duplicate
            "#,
        )
        .bind(&record.key)
        .bind(&record.file_url)
        .bind(&record.rule_id)
        .bind(&record.store_id)
        .bind(record.captured_at)
        .bind(record.processed_at)
        .bind(&record.fingerprint)
        .bind(classification)
        .bind(record.face_count.map(|n| n as i32))
        .bind(record.is_duplicate)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::Persistence(e.to_string()))?;

        tracing::debug!(key = %record.key, "Upserted image record");

        Ok(())
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audits (run_id, rule_id, object_key, status, reason, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.run_id)
        .bind(&record.rule_id)
        .bind(&record.key)
        .bind(record.status.as_str())
        .bind(&record.reason)
        .bind(record.processed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn recent_fingerprints(
        &self,
        partition_prefix: &str,
        window_days: i64,
    ) -> Result<Vec<Fingerprint>> {
        let cutoff = Utc::now() - Duration::days(window_days);
        let pattern = format!("{partition_prefix}%");

        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT fingerprint
            FROM images
            WHERE object_key LIKE $1
              AND processed_at >= $2
              AND fingerprint IS NOT NULL
            "#,
        )
        .bind(&pattern)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::Persistence(e.to_string()))?;

        // Malformed rows are skipped rather than failing the whole run
        let fingerprints = rows
            .iter()
            .filter_map(|hex| match Fingerprint::from_hex(hex) {
                Ok(fp) => Some(fp),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable stored fingerprint");
                    None
                }
            })
            .collect();

        Ok(fingerprints)
    }
}
