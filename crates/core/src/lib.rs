//! Dealsync Core - Domain entities, services, and traits.
//!
//! This crate contains the core business logic for dealsync: idempotent
//! transaction ingestion, the staleness-aware balance cache, the
//! deterministic deal-matching engine, and per-account poller lifecycle
//! management. It is database-agnostic and defines traits that are
//! implemented by the `storage-sqlite` crate; upstream API access goes
//! through gateway traits implemented by the `upstream` crate's clients.

pub mod accounts;
pub mod balances;
pub mod constants;
pub mod deals;
pub mod errors;
pub mod pollers;
pub mod transactions;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
