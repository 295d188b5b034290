//! Pollers module - per-account upstream poll loops.

mod pollers_model;
mod pollers_registry;
mod pollers_tasks;
mod pollers_traits;

#[cfg(test)]
mod pollers_tests;

// Re-export the public interface
pub use pollers_model::{
    CycleControl, CycleReport, PollerConfig, PollerKey, StartOutcome, Upstream,
};
pub use pollers_registry::PollerRegistry;
pub use pollers_tasks::{BankPollTask, ExchangePollTask};
pub use pollers_traits::PollTask;
