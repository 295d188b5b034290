//! Poll task trait.

use async_trait::async_trait;

use super::pollers_model::{CycleControl, CycleReport, Upstream};
use crate::accounts::Account;
use crate::errors::Result;

/// One fetch-and-ingest unit of work, driven repeatedly by the registry.
///
/// A cycle error is reported, not fatal: the registry logs it and schedules
/// the next cycle as usual.
#[async_trait]
pub trait PollTask: Send + Sync {
    fn upstream(&self) -> Upstream;

    async fn run_cycle(&self, account: &Account, ctl: &CycleControl) -> Result<CycleReport>;
}
