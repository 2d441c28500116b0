//! Rule set introspection handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use auditlens_core::Rule;

use crate::error::ApiError;
use crate::state::AppState;

/// Response for the rule listing endpoint
#[derive(Serialize)]
pub struct RulesResponse {
    pub count: usize,
    /// Rule ids in stable sorted order
    pub rule_ids: Vec<String>,
    /// Full rule definitions, including descriptive metadata
    pub rules: Vec<Rule>,
}

/// GET /rules - List the loaded rule set
///
/// Quick check for operators: which rule ids are available for runs, and
/// what each rule requires.
pub async fn list_rules(State(state): State<AppState>) -> Result<Json<RulesResponse>, ApiError> {
    let rule_set = state.rules.load().await?;

    let rule_ids = rule_set.ids();
    let mut rules: Vec<Rule> = rule_set.rules().cloned().collect();
    rules.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Json(RulesResponse {
        count: rule_ids.len(),
        rule_ids,
        rules,
    }))
}
