//! Audit run handler
//!
//! Handles POST /runs requests to execute a batch audit.

use axum::extract::State;
use axum::Json;

use auditlens_core::{RunRequest, RunResult};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /runs - Execute an audit run
///
/// Accepts JSON:
/// - **prefix** (required): object key prefix to audit, e.g. `store123/2026-08-24/`
/// - **rule_id** (required): rule to evaluate; must exist in the rule set
/// - **store_id** (optional): store identifier recorded on image records
/// - **partition_hint** (optional): dedup partition prefix, defaults to `prefix`
///
/// Returns the complete run result with one verdict per item. An unknown
/// rule id is a 400; per-item failures are folded into ERROR verdicts and
/// never fail the request.
pub async fn run_audit(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResult>, ApiError> {
    if request.prefix.is_empty() {
        return Err(ApiError::bad_request("prefix must not be empty"));
    }

    let result = state.pipeline.run(request).await?;
    Ok(Json(result))
}
