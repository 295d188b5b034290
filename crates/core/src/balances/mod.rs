//! Balances module - staleness-aware balance cache.

mod balances_model;
mod balances_service;
mod balances_traits;

#[cfg(test)]
mod balances_service_tests;

// Re-export the public interface
pub use balances_model::{BalanceConfig, BalanceSnapshot, RemoteBalance};
pub use balances_service::BalanceService;
pub use balances_traits::{BalanceGatewayTrait, BalanceRepositoryTrait, BalanceServiceTrait};
