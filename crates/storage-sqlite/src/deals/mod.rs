//! SQLite storage implementation for inferred deals.

mod model;
mod repository;

pub use model::InferredDealDB;
pub use repository::DealRepository;
