//! SQLite storage implementation for the dealsync pipeline.
//!
//! All database access lives here: connection pooling, embedded Diesel
//! migrations, the single-writer actor, and the repository implementations
//! for the traits defined in `dealsync-core`. Every other crate in the
//! workspace is database-agnostic.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod accounts;
pub mod balances;
pub mod deals;
pub mod transactions;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from dealsync-core for convenience
pub use dealsync_core::errors::{DatabaseError, Error, Result};
