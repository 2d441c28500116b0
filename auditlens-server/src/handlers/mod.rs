//! Request handlers module
//!
//! Organizes all HTTP request handlers by endpoint.

pub mod health;
pub mod rules;
pub mod runs;

pub use health::{health, ready};
pub use rules::list_rules;
pub use runs::run_audit;
