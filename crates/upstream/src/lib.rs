//! HTTP clients for the two upstream APIs.
//!
//! This crate owns the wire formats, request throttling, retry policy, and
//! webhook signature verification. It knows nothing about storage or the
//! domain services; adapters in the daemon translate its row types into
//! domain payloads.

pub mod bank;
pub mod errors;
pub mod exchange;
pub mod throttle;
pub mod webhook;

pub use errors::{Result, UpstreamError};
pub use throttle::{GateConfig, RequestGate};
