//! Durable verdict storage backends.
//!
//! The engine talks to [`auditlens_core::VerdictStore`]; this module provides
//! the PostgreSQL implementation used in production. Tests and local runs
//! without a database fall back to the in-memory store from the core crate.

pub mod postgres;

pub use postgres::PostgresVerdictStore;
