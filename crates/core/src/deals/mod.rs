//! Deals module - deterministic transaction matching.

mod deals_model;
mod deals_traits;
mod matching_service;

#[cfg(test)]
mod matching_service_tests;

// Re-export the public interface
pub use deals_model::{group_hash, DealStatus, InferredDeal, MatchConfig};
pub use deals_traits::{DealRepositoryTrait, MatchingServiceTrait};
pub use matching_service::MatchingService;
