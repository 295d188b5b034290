//! Request throttling shared by all calls to one upstream.
//!
//! Bounds in-flight concurrency with a semaphore and enforces a minimum
//! spacing between request starts, so a burst of per-account pollers cannot
//! exceed the provider's rate limits.

use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

/// Default in-flight request cap per upstream.
const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default minimum spacing between request starts.
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Throttle configuration for one upstream.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub max_concurrent: usize,
    pub min_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

/// Shared gate that every request to one upstream passes through.
pub struct RequestGate {
    permits: Semaphore,
    /// Earliest start time for the next request.
    next_slot: Mutex<Instant>,
    min_interval: Duration,
}

impl RequestGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            permits: Semaphore::new(config.max_concurrent),
            next_slot: Mutex::new(Instant::now()),
            min_interval: config.min_interval,
        }
    }

    /// Runs the future once a concurrency permit and a start slot are
    /// available. The outcome of the future does not affect the gate; a
    /// failed request frees its permit like any other.
    pub async fn run<F, T>(&self, fut: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        // The semaphore is never closed.
        let _permit = self.permits.acquire().await.ok();
        self.wait_for_slot().await;
        fut.await
    }

    async fn wait_for_slot(&self) {
        let start = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let start = (*next).max(now);
            *next = start + self.min_interval;
            start
        };
        tokio::time::sleep_until(start).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let gate = Arc::new(RequestGate::new(GateConfig {
            max_concurrent: 3,
            min_interval: Duration::ZERO,
        }));
        let active = Arc::new(AtomicUsize::new(0));
        let exceeded = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let gate = gate.clone();
            let active = active.clone();
            let exceeded = exceeded.clone();
            handles.push(tokio::spawn(async move {
                gate.run(async {
                    if active.fetch_add(1, Ordering::SeqCst) >= 3 {
                        exceeded.store(true, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(!exceeded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_requests_are_spaced() {
        let gate = Arc::new(RequestGate::new(GateConfig {
            max_concurrent: 10,
            min_interval: Duration::from_millis(20),
        }));

        let started = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..5 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.run(async {}).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // Five starts need at least four full intervals between them.
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_failure_frees_the_gate() {
        let gate = RequestGate::new(GateConfig {
            max_concurrent: 1,
            min_interval: Duration::ZERO,
        });

        let first: Result<(), &str> = gate.run(async { Err("boom") }).await;
        assert!(first.is_err());

        let second: Result<(), &str> = gate.run(async { Ok(()) }).await;
        assert!(second.is_ok());
    }
}
