//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Service name
    pub service: &'static str,
    /// Number of rules in the loaded rule set
    pub rules_loaded: usize,
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version, and the number of loaded
/// rules. Used for monitoring and load balancer health checks. A rule set
/// that fails to load marks the service degraded rather than failing the
/// probe.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, rules_loaded) = match state.rules.load().await {
        Ok(rule_set) => ("healthy", rule_set.len()),
        Err(e) => {
            tracing::warn!(error = %e, "Rule set failed to load during health check");
            ("degraded", 0)
        }
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        service: "auditlens-server",
        rules_loaded,
    })
}

/// Readiness response for Kubernetes
#[derive(Serialize)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
}

/// GET /ready - Kubernetes readiness probe
///
/// Returns 200 if the service is ready to accept traffic.
/// Unlike /health, this is a simple yes/no check.
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse { ready: true })
}
