//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use auditlens_core::{AuditPipeline, RuleSetProvider};

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// The audit orchestration engine
    pub pipeline: Arc<AuditPipeline>,
    /// Rule set provider, for the introspection endpoints
    pub rules: Arc<dyn RuleSetProvider>,
}

impl AppState {
    pub fn new(pipeline: Arc<AuditPipeline>, rules: Arc<dyn RuleSetProvider>) -> Self {
        Self { pipeline, rules }
    }
}
