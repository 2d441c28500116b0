//! auditlens-server - REST API for the photo audit engine
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.
//!
//! Endpoints:
//! - POST /runs - Execute an audit run over an object-key prefix
//! - GET /rules - List the loaded rule set
//! - GET /health - Health check
//! - GET /ready - Readiness probe

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod verdict_store;

pub use config::Config;
pub use error::ApiError;
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
pub use verdict_store::PostgresVerdictStore;
